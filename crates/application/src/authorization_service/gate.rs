use std::collections::BTreeSet;

/// Reduces an effective set to a decision.
///
/// `require_all` asks for `required ⊆ effective`, otherwise a non-empty
/// intersection. An empty requirement always passes.
#[must_use]
pub fn satisfies<S: AsRef<str>>(
    effective: &BTreeSet<String>,
    required: &[S],
    require_all: bool,
) -> bool {
    if required.is_empty() {
        return true;
    }

    let mut held = required
        .iter()
        .map(|codename| effective.contains(codename.as_ref()));

    if require_all {
        held.all(|value| value)
    } else {
        held.any(|value| value)
    }
}
