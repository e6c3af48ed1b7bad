use crate::Error;

/// Result of an operation that produces no value.
///
/// `Ok(())` is the one and only success; test it by matching, not by
/// inspecting codes. Functions that accumulate several fallible steps keep a
/// local `Outcome` and feed each step through [`chain`].
pub type Outcome = Result<(), Error>;

/// Chain `incoming` onto `current`.
///
/// - `incoming` is `Ok`: no-op.
/// - `current` is `Ok`: `current` becomes `incoming`.
/// - both are errors: `current` becomes `incoming` with the prior error as
///   its cause. If `incoming` already has a cause, or is statically defined,
///   the splice is refused ([`Error::with_cause`] reports and drops the prior
///   error) — `incoming` still becomes `current`, unspliced.
///
/// Net effect: `current` always holds the most recent error, causally linked
/// to everything before it, or `Ok(())` if nothing failed.
pub fn chain(current: &mut Outcome, incoming: Outcome) {
    let Err(incoming) = incoming else { return };
    let prior = std::mem::replace(current, Ok(()));
    *current = Err(match prior {
        Ok(()) => incoming,
        Err(prior) => incoming.with_cause(prior),
    });
}
