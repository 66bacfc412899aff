//! Fluent builders that lower typed reaction declarations into the erased
//! [`ReactionInfo`] descriptors the runtime consumes.
//!
//! A reaction is declared site by site, left to right: `when(&a)` opens it,
//! `.and*(&b)` extends it, `.then_do(f)` closes it. Each site can match any
//! value (`when`/`and`), ignore the value (`*_ignore`), require structural
//! equality (`*_eq`), or apply a pure predicate (`*_where`). Blocking sites
//! (`*_sync*`) additionally hand the body a [`Reply`] handle, bundled with
//! the value as a `(value, reply)` pair in the body's argument list.
//!
//! The body receives one argument per input site, in source order.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::emitter::{Emitter, SpeciesRef, SyncEmitter};
use crate::pattern::{InputSite, Pattern, ReactionBody, ReactionInfo};
use crate::reply::Reply;
use crate::types::Message;

/// Recovers one site's typed body argument from the erased payload and, for
/// blocking sites, the erased reply handle.
type Decoder<A> = Box<dyn Fn(Message, Option<Message>) -> A + Send + Sync>;

fn async_site<V>(emitter: &Emitter<V>, pattern: Pattern<V>) -> (InputSite, Decoder<V>)
where
    V: Any + Send,
{
    let site = InputSite::new(emitter.species().clone(), pattern.erase(), false);
    let decoder: Decoder<V> = Box::new(|value, _reply| *value.downcast::<V>().unwrap());
    (site, decoder)
}

fn sync_site<V, R>(
    emitter: &SyncEmitter<V, R>,
    pattern: Pattern<V>,
) -> (InputSite, Decoder<(V, Reply<R>)>)
where
    V: Any + Send,
    R: Any + Send,
{
    let site = InputSite::new(emitter.species().clone(), pattern.erase(), true);
    let decoder: Decoder<(V, Reply<R>)> = Box::new(|value, reply| {
        let value = *value.downcast::<V>().unwrap();
        let reply = *reply.unwrap().downcast::<Reply<R>>().unwrap();
        (value, reply)
    });
    (site, decoder)
}

/**********************************
 * Unary partial pattern          *
 **********************************/

/// Open a reaction whose first site binds any value of `emitter`'s species.
pub fn when<V>(emitter: &Emitter<V>) -> PartialPattern1<V>
where
    V: Any + Send,
{
    PartialPattern1::start(async_site(emitter, Pattern::variable()))
}

/// Open a reaction whose first site consumes any value without caring for it.
pub fn when_ignore<V>(emitter: &Emitter<V>) -> PartialPattern1<V>
where
    V: Any + Send,
{
    PartialPattern1::start(async_site(emitter, Pattern::wildcard()))
}

/// Open a reaction whose first site requires a value equal to `expected`.
pub fn when_eq<V>(emitter: &Emitter<V>, expected: V) -> PartialPattern1<V>
where
    V: Any + Send + Sync + PartialEq + fmt::Debug,
{
    PartialPattern1::start(async_site(emitter, Pattern::eq(expected)))
}

/// Open a reaction whose first site requires the predicate to hold.
pub fn when_where<V, F>(emitter: &Emitter<V>, pred: F) -> PartialPattern1<V>
where
    V: Any + Send,
    F: Fn(&V) -> bool + Send + Sync + 'static,
{
    PartialPattern1::start(async_site(emitter, Pattern::matching(pred)))
}

/// Open a reaction whose first site matches with an explicit [`Pattern`].
pub fn when_pattern<V>(emitter: &Emitter<V>, pattern: Pattern<V>) -> PartialPattern1<V>
where
    V: Any + Send,
{
    PartialPattern1::start(async_site(emitter, pattern))
}

/// Open a reaction whose first site is a blocking emission; the body receives
/// the value paired with its [`Reply`] handle.
pub fn when_sync<V, R>(emitter: &SyncEmitter<V, R>) -> PartialPattern1<(V, Reply<R>)>
where
    V: Any + Send,
    R: Any + Send,
{
    PartialPattern1::start(sync_site(emitter, Pattern::variable()))
}

/// Blocking first site with an equality requirement on the carried value.
pub fn when_sync_eq<V, R>(emitter: &SyncEmitter<V, R>, expected: V) -> PartialPattern1<(V, Reply<R>)>
where
    V: Any + Send + Sync + PartialEq + fmt::Debug,
    R: Any + Send,
{
    PartialPattern1::start(sync_site(emitter, Pattern::eq(expected)))
}

/// Blocking first site with a predicate on the carried value.
pub fn when_sync_where<V, R, F>(
    emitter: &SyncEmitter<V, R>,
    pred: F,
) -> PartialPattern1<(V, Reply<R>)>
where
    V: Any + Send,
    R: Any + Send,
    F: Fn(&V) -> bool + Send + Sync + 'static,
{
    PartialPattern1::start(sync_site(emitter, Pattern::matching(pred)))
}

/// Blocking first site matching with an explicit [`Pattern`].
pub fn when_sync_pattern<V, R>(
    emitter: &SyncEmitter<V, R>,
    pattern: Pattern<V>,
) -> PartialPattern1<(V, Reply<R>)>
where
    V: Any + Send,
    R: Any + Send,
{
    PartialPattern1::start(sync_site(emitter, pattern))
}

/// Reaction under construction with one declared input site.
pub struct PartialPattern1<A> {
    sites: Vec<InputSite>,
    outputs: Vec<String>,
    decoder: Decoder<A>,
}

impl<A: 'static> PartialPattern1<A> {
    fn start((site, decoder): (InputSite, Decoder<A>)) -> PartialPattern1<A> {
        PartialPattern1 {
            sites: vec![site],
            outputs: Vec::new(),
            decoder,
        }
    }

    /// Add a second site binding any value of `emitter`'s species.
    pub fn and<V>(self, emitter: &Emitter<V>) -> PartialPattern2<A, V>
    where
        V: Any + Send,
    {
        self.extend(async_site(emitter, Pattern::variable()))
    }

    /// Add a second site consuming any value without caring for it.
    pub fn and_ignore<V>(self, emitter: &Emitter<V>) -> PartialPattern2<A, V>
    where
        V: Any + Send,
    {
        self.extend(async_site(emitter, Pattern::wildcard()))
    }

    /// Add a second site requiring a value equal to `expected`.
    pub fn and_eq<V>(self, emitter: &Emitter<V>, expected: V) -> PartialPattern2<A, V>
    where
        V: Any + Send + Sync + PartialEq + fmt::Debug,
    {
        self.extend(async_site(emitter, Pattern::eq(expected)))
    }

    /// Add a second site requiring the predicate to hold.
    pub fn and_where<V, F>(self, emitter: &Emitter<V>, pred: F) -> PartialPattern2<A, V>
    where
        V: Any + Send,
        F: Fn(&V) -> bool + Send + Sync + 'static,
    {
        self.extend(async_site(emitter, Pattern::matching(pred)))
    }

    /// Add a second, blocking site.
    pub fn and_sync<V, R>(self, emitter: &SyncEmitter<V, R>) -> PartialPattern2<A, (V, Reply<R>)>
    where
        V: Any + Send,
        R: Any + Send,
    {
        self.extend(sync_site(emitter, Pattern::variable()))
    }

    /// Add a second, blocking site with an equality requirement.
    pub fn and_sync_eq<V, R>(
        self,
        emitter: &SyncEmitter<V, R>,
        expected: V,
    ) -> PartialPattern2<A, (V, Reply<R>)>
    where
        V: Any + Send + Sync + PartialEq + fmt::Debug,
        R: Any + Send,
    {
        self.extend(sync_site(emitter, Pattern::eq(expected)))
    }

    /// Add a second, blocking site with a predicate.
    pub fn and_sync_where<V, R, F>(
        self,
        emitter: &SyncEmitter<V, R>,
        pred: F,
    ) -> PartialPattern2<A, (V, Reply<R>)>
    where
        V: Any + Send,
        R: Any + Send,
        F: Fn(&V) -> bool + Send + Sync + 'static,
    {
        self.extend(sync_site(emitter, Pattern::matching(pred)))
    }

    /// Add a second site matching with an explicit [`Pattern`].
    pub fn and_pattern<V>(self, emitter: &Emitter<V>, pattern: Pattern<V>) -> PartialPattern2<A, V>
    where
        V: Any + Send,
    {
        self.extend(async_site(emitter, pattern))
    }

    /// Add a second, blocking site matching with an explicit [`Pattern`].
    pub fn and_sync_pattern<V, R>(
        self,
        emitter: &SyncEmitter<V, R>,
        pattern: Pattern<V>,
    ) -> PartialPattern2<A, (V, Reply<R>)>
    where
        V: Any + Send,
        R: Any + Send,
    {
        self.extend(sync_site(emitter, pattern))
    }

    fn extend<B>(mut self, (site, decoder): (InputSite, Decoder<B>)) -> PartialPattern2<A, B> {
        self.sites.push(site);
        PartialPattern2 {
            sites: self.sites,
            outputs: self.outputs,
            decoders: (self.decoder, decoder),
        }
    }

    /// Declare the species this reaction's body emits, for diagnostics.
    pub fn emits(mut self, outputs: &[&dyn SpeciesRef]) -> Self {
        self.outputs = outputs.iter().map(|s| s.species_label()).collect();
        self
    }

    /// Close the reaction with its body.
    pub fn then_do<F>(self, f: F) -> ReactionInfo
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        let sync1 = self.sites[0].binds_reply;
        let decoder = self.decoder;
        let body: ReactionBody = Arc::new(move |mut values: Vec<Message>, replies| {
            let mut replies = replies.into_iter();
            let a = decoder(values.remove(0), sync1.then(|| replies.next()).flatten());
            f(a);
        });
        ReactionInfo::new(self.sites, body, self.outputs)
    }
}

/**********************************
 * Binary partial pattern         *
 **********************************/

/// Reaction under construction with two declared input sites.
pub struct PartialPattern2<A, B> {
    sites: Vec<InputSite>,
    outputs: Vec<String>,
    decoders: (Decoder<A>, Decoder<B>),
}

impl<A: 'static, B: 'static> PartialPattern2<A, B> {
    /// Add a third site binding any value of `emitter`'s species.
    pub fn and<V>(self, emitter: &Emitter<V>) -> PartialPattern3<A, B, V>
    where
        V: Any + Send,
    {
        self.extend(async_site(emitter, Pattern::variable()))
    }

    /// Add a third site consuming any value without caring for it.
    pub fn and_ignore<V>(self, emitter: &Emitter<V>) -> PartialPattern3<A, B, V>
    where
        V: Any + Send,
    {
        self.extend(async_site(emitter, Pattern::wildcard()))
    }

    /// Add a third site requiring a value equal to `expected`.
    pub fn and_eq<V>(self, emitter: &Emitter<V>, expected: V) -> PartialPattern3<A, B, V>
    where
        V: Any + Send + Sync + PartialEq + fmt::Debug,
    {
        self.extend(async_site(emitter, Pattern::eq(expected)))
    }

    /// Add a third site requiring the predicate to hold.
    pub fn and_where<V, F>(self, emitter: &Emitter<V>, pred: F) -> PartialPattern3<A, B, V>
    where
        V: Any + Send,
        F: Fn(&V) -> bool + Send + Sync + 'static,
    {
        self.extend(async_site(emitter, Pattern::matching(pred)))
    }

    /// Add a third, blocking site.
    pub fn and_sync<V, R>(
        self,
        emitter: &SyncEmitter<V, R>,
    ) -> PartialPattern3<A, B, (V, Reply<R>)>
    where
        V: Any + Send,
        R: Any + Send,
    {
        self.extend(sync_site(emitter, Pattern::variable()))
    }

    /// Add a third, blocking site with an equality requirement.
    pub fn and_sync_eq<V, R>(
        self,
        emitter: &SyncEmitter<V, R>,
        expected: V,
    ) -> PartialPattern3<A, B, (V, Reply<R>)>
    where
        V: Any + Send + Sync + PartialEq + fmt::Debug,
        R: Any + Send,
    {
        self.extend(sync_site(emitter, Pattern::eq(expected)))
    }

    /// Add a third, blocking site with a predicate.
    pub fn and_sync_where<V, R, F>(
        self,
        emitter: &SyncEmitter<V, R>,
        pred: F,
    ) -> PartialPattern3<A, B, (V, Reply<R>)>
    where
        V: Any + Send,
        R: Any + Send,
        F: Fn(&V) -> bool + Send + Sync + 'static,
    {
        self.extend(sync_site(emitter, Pattern::matching(pred)))
    }

    /// Add a third site matching with an explicit [`Pattern`].
    pub fn and_pattern<V>(
        self,
        emitter: &Emitter<V>,
        pattern: Pattern<V>,
    ) -> PartialPattern3<A, B, V>
    where
        V: Any + Send,
    {
        self.extend(async_site(emitter, pattern))
    }

    /// Add a third, blocking site matching with an explicit [`Pattern`].
    pub fn and_sync_pattern<V, R>(
        self,
        emitter: &SyncEmitter<V, R>,
        pattern: Pattern<V>,
    ) -> PartialPattern3<A, B, (V, Reply<R>)>
    where
        V: Any + Send,
        R: Any + Send,
    {
        self.extend(sync_site(emitter, pattern))
    }

    fn extend<C>(mut self, (site, decoder): (InputSite, Decoder<C>)) -> PartialPattern3<A, B, C> {
        self.sites.push(site);
        let (d1, d2) = self.decoders;
        PartialPattern3 {
            sites: self.sites,
            outputs: self.outputs,
            decoders: (d1, d2, decoder),
        }
    }

    /// Declare the species this reaction's body emits, for diagnostics.
    pub fn emits(mut self, outputs: &[&dyn SpeciesRef]) -> Self {
        self.outputs = outputs.iter().map(|s| s.species_label()).collect();
        self
    }

    /// Close the reaction with its body.
    pub fn then_do<F>(self, f: F) -> ReactionInfo
    where
        F: Fn(A, B) + Send + Sync + 'static,
    {
        let sync1 = self.sites[0].binds_reply;
        let sync2 = self.sites[1].binds_reply;
        let (d1, d2) = self.decoders;
        let body: ReactionBody = Arc::new(move |mut values: Vec<Message>, replies| {
            let mut replies = replies.into_iter();
            let a = d1(values.remove(0), sync1.then(|| replies.next()).flatten());
            let b = d2(values.remove(0), sync2.then(|| replies.next()).flatten());
            f(a, b);
        });
        ReactionInfo::new(self.sites, body, self.outputs)
    }
}

/**********************************
 * Ternary partial pattern        *
 **********************************/

/// Reaction under construction with three declared input sites.
pub struct PartialPattern3<A, B, C> {
    sites: Vec<InputSite>,
    outputs: Vec<String>,
    decoders: (Decoder<A>, Decoder<B>, Decoder<C>),
}

impl<A: 'static, B: 'static, C: 'static> PartialPattern3<A, B, C> {
    /// Declare the species this reaction's body emits, for diagnostics.
    pub fn emits(mut self, outputs: &[&dyn SpeciesRef]) -> Self {
        self.outputs = outputs.iter().map(|s| s.species_label()).collect();
        self
    }

    /// Close the reaction with its body.
    pub fn then_do<F>(self, f: F) -> ReactionInfo
    where
        F: Fn(A, B, C) + Send + Sync + 'static,
    {
        let sync1 = self.sites[0].binds_reply;
        let sync2 = self.sites[1].binds_reply;
        let sync3 = self.sites[2].binds_reply;
        let (d1, d2, d3) = self.decoders;
        let body: ReactionBody = Arc::new(move |mut values: Vec<Message>, replies| {
            let mut replies = replies.into_iter();
            let a = d1(values.remove(0), sync1.then(|| replies.next()).flatten());
            let b = d2(values.remove(0), sync2.then(|| replies.next()).flatten());
            let c = d3(values.remove(0), sync3.then(|| replies.next()).flatten());
            f(a, b, c);
        });
        ReactionInfo::new(self.sites, body, self.outputs)
    }
}

#[cfg(test)]
mod tests {
    use crossbeam_channel::unbounded;

    use super::*;
    use crate::reply::reply_pair;

    #[test]
    fn body_receives_decoded_values_in_source_order() {
        // Given:
        let a = Emitter::<i64>::named("a");
        let b = Emitter::<String>::named("b");
        let (seen_tx, seen_rx) = unbounded();

        let reaction = when(&a).and(&b).then_do(move |x, y: String| {
            seen_tx.send((x, y)).unwrap();
        });

        // When: invoked the way a firing would.
        let body = reaction.body();
        (*body)(
            vec![Message::new(7_i64), Message::new("mol".to_string())],
            vec![],
        );

        // Then:
        assert_eq!((7, "mol".to_string()), seen_rx.recv().unwrap());
    }

    #[test]
    fn sync_site_receives_value_and_reply_pair() {
        // Given:
        let counter = Emitter::<i64>::named("counter");
        let fetch = SyncEmitter::<(), i64>::named("fetch");

        let reaction = when(&counter).and_sync(&fetch).then_do(|n, (_, reply)| {
            reply.reply(n);
        });
        assert!(reaction.has_sync_site());

        // When:
        let (reply, receiver) = reply_pair::<i64>();
        let body = reaction.body();
        (*body)(
            vec![Message::new(9_i64), Message::new(())],
            vec![Message::new(reply)],
        );

        // Then:
        assert_eq!(Ok(9), receiver.recv());
    }

    #[test]
    fn emits_records_output_names() {
        let a = Emitter::<i64>::named("a");
        let b = Emitter::<i64>::named("b");

        let reaction = when(&a).emits(&[&b]).then_do(|_| {});

        assert_eq!("a(x) => b", reaction.to_string());
    }
}
