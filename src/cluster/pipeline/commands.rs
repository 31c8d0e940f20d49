use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;

use crate::core::command::{
    self, frame_to_bool, frame_to_bytes, frame_to_float, frame_to_int, frame_to_map,
    frame_to_opt_int, frame_to_scored, frame_to_status, frame_to_value, frame_to_vec_bytes,
    frame_to_vec_int, frame_to_vec_opt_bytes, ListPosition, LposOptions,
};
use crate::proto::error::Result;
use crate::proto::frame::Frame;

use super::super::response::Deferred;
use super::super::router::Route;
use super::super::slot::key_slot;
use super::ClusterPipeline;

type Pending<T> = Result<Deferred<T>>;

impl ClusterPipeline {
    // Strings

    /// Queues GET. Missing keys resolve to `None`.
    pub fn get(&mut self, key: impl Into<Bytes>) -> Pending<Option<Bytes>> {
        self.enqueue(command::get(key), frame_to_bytes)
    }

    /// Queues SET.
    pub fn set(&mut self, key: impl Into<Bytes>, value: impl Into<Bytes>) -> Pending<String> {
        self.enqueue(command::set(key, value), frame_to_status)
    }

    /// Queues SET with an EX expiration.
    pub fn set_with_expiry(
        &mut self,
        key: impl Into<Bytes>,
        value: impl Into<Bytes>,
        expiry: Duration,
    ) -> Pending<String> {
        self.enqueue(command::set_with_expiry(key, value, expiry), frame_to_status)
    }

    /// Queues SETNX.
    pub fn setnx(&mut self, key: impl Into<Bytes>, value: impl Into<Bytes>) -> Pending<bool> {
        self.enqueue(command::setnx(key, value), frame_to_bool)
    }

    /// Queues DEL. All keys must share a slot.
    pub fn del<I, K>(&mut self, keys: I) -> Pending<i64>
    where
        I: IntoIterator<Item = K>,
        K: Into<Bytes>,
    {
        self.enqueue(command::del(keys), frame_to_int)
    }

    /// Queues EXISTS. All keys must share a slot.
    pub fn exists<I, K>(&mut self, keys: I) -> Pending<i64>
    where
        I: IntoIterator<Item = K>,
        K: Into<Bytes>,
    {
        self.enqueue(command::exists(keys), frame_to_int)
    }

    /// Queues INCR.
    pub fn incr(&mut self, key: impl Into<Bytes>) -> Pending<i64> {
        self.enqueue(command::incr(key), frame_to_int)
    }

    /// Queues INCRBY.
    pub fn incr_by(&mut self, key: impl Into<Bytes>, amount: i64) -> Pending<i64> {
        self.enqueue(command::incr_by(key, amount), frame_to_int)
    }

    /// Queues DECR.
    pub fn decr(&mut self, key: impl Into<Bytes>) -> Pending<i64> {
        self.enqueue(command::decr(key), frame_to_int)
    }

    /// Queues DECRBY.
    pub fn decr_by(&mut self, key: impl Into<Bytes>, amount: i64) -> Pending<i64> {
        self.enqueue(command::decr_by(key, amount), frame_to_int)
    }

    /// Queues APPEND.
    pub fn append(&mut self, key: impl Into<Bytes>, value: impl Into<Bytes>) -> Pending<i64> {
        self.enqueue(command::append(key, value), frame_to_int)
    }

    /// Queues STRLEN.
    pub fn strlen(&mut self, key: impl Into<Bytes>) -> Pending<i64> {
        self.enqueue(command::strlen(key), frame_to_int)
    }

    /// Queues GETRANGE.
    pub fn getrange(&mut self, key: impl Into<Bytes>, start: i64, end: i64) -> Pending<Option<Bytes>> {
        self.enqueue(command::getrange(key, start, end), frame_to_bytes)
    }

    /// Queues SETRANGE.
    pub fn setrange(
        &mut self,
        key: impl Into<Bytes>,
        offset: u64,
        value: impl Into<Bytes>,
    ) -> Pending<i64> {
        self.enqueue(command::setrange(key, offset, value), frame_to_int)
    }

    // Lists

    /// Queues LPUSH.
    pub fn lpush<I, V>(&mut self, key: impl Into<Bytes>, values: I) -> Pending<i64>
    where
        I: IntoIterator<Item = V>,
        V: Into<Bytes>,
    {
        self.enqueue(command::lpush(key, values), frame_to_int)
    }

    /// Queues RPUSH.
    pub fn rpush<I, V>(&mut self, key: impl Into<Bytes>, values: I) -> Pending<i64>
    where
        I: IntoIterator<Item = V>,
        V: Into<Bytes>,
    {
        self.enqueue(command::rpush(key, values), frame_to_int)
    }

    /// Queues LPUSHX.
    pub fn lpushx<I, V>(&mut self, key: impl Into<Bytes>, values: I) -> Pending<i64>
    where
        I: IntoIterator<Item = V>,
        V: Into<Bytes>,
    {
        self.enqueue(command::lpushx(key, values), frame_to_int)
    }

    /// Queues RPUSHX.
    pub fn rpushx<I, V>(&mut self, key: impl Into<Bytes>, values: I) -> Pending<i64>
    where
        I: IntoIterator<Item = V>,
        V: Into<Bytes>,
    {
        self.enqueue(command::rpushx(key, values), frame_to_int)
    }

    /// Queues LPOP of a single element.
    pub fn lpop(&mut self, key: impl Into<Bytes>) -> Pending<Option<Bytes>> {
        self.enqueue(command::lpop(key, None), frame_to_bytes)
    }

    /// Queues LPOP of up to `count` elements.
    pub fn lpop_count(&mut self, key: impl Into<Bytes>, count: usize) -> Pending<Vec<Bytes>> {
        self.enqueue(command::lpop(key, Some(count)), frame_to_vec_bytes)
    }

    /// Queues RPOP of a single element.
    pub fn rpop(&mut self, key: impl Into<Bytes>) -> Pending<Option<Bytes>> {
        self.enqueue(command::rpop(key, None), frame_to_bytes)
    }

    /// Queues RPOP of up to `count` elements.
    pub fn rpop_count(&mut self, key: impl Into<Bytes>, count: usize) -> Pending<Vec<Bytes>> {
        self.enqueue(command::rpop(key, Some(count)), frame_to_vec_bytes)
    }

    /// Queues LRANGE.
    pub fn lrange(&mut self, key: impl Into<Bytes>, start: i64, stop: i64) -> Pending<Vec<Bytes>> {
        self.enqueue(command::lrange(key, start, stop), frame_to_vec_bytes)
    }

    /// Queues LLEN.
    pub fn llen(&mut self, key: impl Into<Bytes>) -> Pending<i64> {
        self.enqueue(command::llen(key), frame_to_int)
    }

    /// Queues LINDEX.
    pub fn lindex(&mut self, key: impl Into<Bytes>, index: i64) -> Pending<Option<Bytes>> {
        self.enqueue(command::lindex(key, index), frame_to_bytes)
    }

    /// Queues LSET.
    pub fn lset(&mut self, key: impl Into<Bytes>, index: i64, value: impl Into<Bytes>) -> Pending<String> {
        self.enqueue(command::lset(key, index, value), frame_to_status)
    }

    /// Queues LREM.
    pub fn lrem(&mut self, key: impl Into<Bytes>, count: i64, value: impl Into<Bytes>) -> Pending<i64> {
        self.enqueue(command::lrem(key, count, value), frame_to_int)
    }

    /// Queues LTRIM.
    pub fn ltrim(&mut self, key: impl Into<Bytes>, start: i64, stop: i64) -> Pending<String> {
        self.enqueue(command::ltrim(key, start, stop), frame_to_status)
    }

    /// Queues LPOS. Resolves to `None` when the element is not in the list.
    pub fn lpos(
        &mut self,
        key: impl Into<Bytes>,
        element: impl Into<Bytes>,
        options: LposOptions,
    ) -> Pending<Option<i64>> {
        self.enqueue(command::lpos(key, element, options), frame_to_opt_int)
    }

    /// Queues LPOS ... COUNT, resolving to every matching index found.
    pub fn lpos_count(
        &mut self,
        key: impl Into<Bytes>,
        element: impl Into<Bytes>,
        count: usize,
        options: LposOptions,
    ) -> Pending<Vec<i64>> {
        self.enqueue(command::lpos_count(key, element, count, options), frame_to_vec_int)
    }

    /// Queues LINSERT.
    pub fn linsert(
        &mut self,
        key: impl Into<Bytes>,
        position: ListPosition,
        pivot: impl Into<Bytes>,
        element: impl Into<Bytes>,
    ) -> Pending<i64> {
        self.enqueue(command::linsert(key, position, pivot, element), frame_to_int)
    }

    // Sets

    /// Queues SADD.
    pub fn sadd<I, V>(&mut self, key: impl Into<Bytes>, members: I) -> Pending<i64>
    where
        I: IntoIterator<Item = V>,
        V: Into<Bytes>,
    {
        self.enqueue(command::sadd(key, members), frame_to_int)
    }

    /// Queues SREM.
    pub fn srem<I, V>(&mut self, key: impl Into<Bytes>, members: I) -> Pending<i64>
    where
        I: IntoIterator<Item = V>,
        V: Into<Bytes>,
    {
        self.enqueue(command::srem(key, members), frame_to_int)
    }

    /// Queues SMEMBERS.
    pub fn smembers(&mut self, key: impl Into<Bytes>) -> Pending<Vec<Bytes>> {
        self.enqueue(command::smembers(key), frame_to_vec_bytes)
    }

    /// Queues SPOP.
    pub fn spop(&mut self, key: impl Into<Bytes>) -> Pending<Option<Bytes>> {
        self.enqueue(command::spop(key), frame_to_bytes)
    }

    /// Queues SCARD.
    pub fn scard(&mut self, key: impl Into<Bytes>) -> Pending<i64> {
        self.enqueue(command::scard(key), frame_to_int)
    }

    /// Queues SISMEMBER.
    pub fn sismember(&mut self, key: impl Into<Bytes>, member: impl Into<Bytes>) -> Pending<bool> {
        self.enqueue(command::sismember(key, member), frame_to_bool)
    }

    // Hashes

    /// Queues HSET of one field.
    pub fn hset(
        &mut self,
        key: impl Into<Bytes>,
        field: impl Into<Bytes>,
        value: impl Into<Bytes>,
    ) -> Pending<i64> {
        self.enqueue(command::hset(key, field, value), frame_to_int)
    }

    /// Queues HSET of several fields.
    pub fn hset_multiple<I, F, V>(&mut self, key: impl Into<Bytes>, pairs: I) -> Pending<i64>
    where
        I: IntoIterator<Item = (F, V)>,
        F: Into<Bytes>,
        V: Into<Bytes>,
    {
        self.enqueue(command::hset_multiple(key, pairs), frame_to_int)
    }

    /// Queues HSETNX.
    pub fn hsetnx(
        &mut self,
        key: impl Into<Bytes>,
        field: impl Into<Bytes>,
        value: impl Into<Bytes>,
    ) -> Pending<bool> {
        self.enqueue(command::hsetnx(key, field, value), frame_to_bool)
    }

    /// Queues HGET.
    pub fn hget(&mut self, key: impl Into<Bytes>, field: impl Into<Bytes>) -> Pending<Option<Bytes>> {
        self.enqueue(command::hget(key, field), frame_to_bytes)
    }

    /// Queues HMGET. Missing fields resolve to `None`.
    pub fn hmget<I, F>(&mut self, key: impl Into<Bytes>, fields: I) -> Pending<Vec<Option<Bytes>>>
    where
        I: IntoIterator<Item = F>,
        F: Into<Bytes>,
    {
        self.enqueue(command::hmget(key, fields), frame_to_vec_opt_bytes)
    }

    /// Queues HGETALL.
    pub fn hgetall(&mut self, key: impl Into<Bytes>) -> Pending<HashMap<Bytes, Bytes>> {
        self.enqueue(command::hgetall(key), frame_to_map)
    }

    /// Queues HKEYS.
    pub fn hkeys(&mut self, key: impl Into<Bytes>) -> Pending<Vec<Bytes>> {
        self.enqueue(command::hkeys(key), frame_to_vec_bytes)
    }

    /// Queues HVALS.
    pub fn hvals(&mut self, key: impl Into<Bytes>) -> Pending<Vec<Bytes>> {
        self.enqueue(command::hvals(key), frame_to_vec_bytes)
    }

    /// Queues HDEL.
    pub fn hdel<I, F>(&mut self, key: impl Into<Bytes>, fields: I) -> Pending<i64>
    where
        I: IntoIterator<Item = F>,
        F: Into<Bytes>,
    {
        self.enqueue(command::hdel(key, fields), frame_to_int)
    }

    /// Queues HEXISTS.
    pub fn hexists(&mut self, key: impl Into<Bytes>, field: impl Into<Bytes>) -> Pending<bool> {
        self.enqueue(command::hexists(key, field), frame_to_bool)
    }

    /// Queues HLEN.
    pub fn hlen(&mut self, key: impl Into<Bytes>) -> Pending<i64> {
        self.enqueue(command::hlen(key), frame_to_int)
    }

    /// Queues HINCRBY.
    pub fn hincrby(&mut self, key: impl Into<Bytes>, field: impl Into<Bytes>, increment: i64) -> Pending<i64> {
        self.enqueue(command::hincrby(key, field, increment), frame_to_int)
    }

    /// Queues HINCRBYFLOAT.
    pub fn hincrbyfloat(
        &mut self,
        key: impl Into<Bytes>,
        field: impl Into<Bytes>,
        increment: f64,
    ) -> Pending<f64> {
        self.enqueue(command::hincrbyfloat(key, field, increment), frame_to_float)
    }

    /// Queues HSTRLEN.
    pub fn hstrlen(&mut self, key: impl Into<Bytes>, field: impl Into<Bytes>) -> Pending<i64> {
        self.enqueue(command::hstrlen(key, field), frame_to_int)
    }

    /// Queues HRANDFIELD. Resolves to `None` for a missing key.
    pub fn hrandfield(&mut self, key: impl Into<Bytes>) -> Pending<Option<Bytes>> {
        self.enqueue(command::hrandfield(key), frame_to_bytes)
    }

    /// Queues HRANDFIELD with a count.
    pub fn hrandfield_count(&mut self, key: impl Into<Bytes>, count: i64) -> Pending<Vec<Bytes>> {
        self.enqueue(command::hrandfield_count(key, count), frame_to_vec_bytes)
    }

    /// Queues HRANDFIELD ... WITHVALUES.
    ///
    /// Fields repeated by a negative `count` collapse into one map entry.
    pub fn hrandfield_withvalues(
        &mut self,
        key: impl Into<Bytes>,
        count: i64,
    ) -> Pending<HashMap<Bytes, Bytes>> {
        self.enqueue(command::hrandfield_withvalues(key, count), frame_to_map)
    }

    // Sorted sets

    /// Queues ZADD of one member.
    pub fn zadd(&mut self, key: impl Into<Bytes>, score: f64, member: impl Into<Bytes>) -> Pending<i64> {
        self.enqueue(command::zadd(key, score, member), frame_to_int)
    }

    /// Queues ZINCRBY.
    pub fn zincrby(&mut self, key: impl Into<Bytes>, increment: f64, member: impl Into<Bytes>) -> Pending<f64> {
        self.enqueue(command::zincrby(key, increment, member), frame_to_float)
    }

    /// Queues ZCARD.
    pub fn zcard(&mut self, key: impl Into<Bytes>) -> Pending<i64> {
        self.enqueue(command::zcard(key), frame_to_int)
    }

    /// Queues ZRANGE.
    pub fn zrange(&mut self, key: impl Into<Bytes>, start: i64, stop: i64) -> Pending<Vec<Bytes>> {
        self.enqueue(command::zrange(key, start, stop), frame_to_vec_bytes)
    }

    /// Queues ZRANGE ... WITHSCORES.
    pub fn zrange_withscores(
        &mut self,
        key: impl Into<Bytes>,
        start: i64,
        stop: i64,
    ) -> Pending<Vec<(Bytes, f64)>> {
        self.enqueue(command::zrange_withscores(key, start, stop), frame_to_scored)
    }

    // Generic

    /// Queues SORT.
    pub fn sort(&mut self, key: impl Into<Bytes>) -> Pending<Vec<Bytes>> {
        self.enqueue(command::sort(key), frame_to_vec_bytes)
    }

    /// Queues SORT ... STORE. Both keys must share a slot.
    pub fn sort_store(&mut self, key: impl Into<Bytes>, destination: impl Into<Bytes>) -> Pending<i64> {
        self.enqueue(command::sort_store(key, destination), frame_to_int)
    }

    /// Queues PUBLISH on any node. Resolves to the number of receivers.
    pub fn publish(&mut self, channel: impl Into<Bytes>, message: impl Into<Bytes>) -> Pending<i64> {
        self.enqueue_to(command::publish(channel, message), Route::Any, frame_to_int)
    }

    // Scripting

    /// Queues EVAL, routed by the slot of `keys`.
    ///
    /// The script result is returned as a raw [`Frame`]; a script without a
    /// return value resolves to [`Frame::Null`].
    pub fn eval<K, A>(&mut self, script: impl Into<Bytes>, keys: K, args: A) -> Pending<Frame>
    where
        K: IntoIterator,
        K::Item: Into<Bytes>,
        A: IntoIterator,
        A::Item: Into<Bytes>,
    {
        self.enqueue(command::eval(script, keys, args), frame_to_value)
    }

    /// Queues EVALSHA of a script loaded with SCRIPT LOAD.
    pub fn evalsha<K, A>(&mut self, sha1: impl Into<Bytes>, keys: K, args: A) -> Pending<Frame>
    where
        K: IntoIterator,
        K::Item: Into<Bytes>,
        A: IntoIterator,
        A::Item: Into<Bytes>,
    {
        self.enqueue(command::evalsha(sha1, keys, args), frame_to_value)
    }

    /// Queues SCRIPT LOAD on the node owning `slot_hint_key`.
    ///
    /// Scripts are cached per node, so load on the node that will run them.
    pub fn script_load(&mut self, script: impl Into<Bytes>, slot_hint_key: impl Into<Bytes>) -> Pending<String> {
        let hint: Bytes = slot_hint_key.into();
        let slot = key_slot(&hint);
        self.enqueue_to(command::script_load(script), Route::Slot(slot), frame_to_status)
    }
}
