/// Whether a client accepting `accepted` output modes can be served by an
/// agent producing `supported`.
///
/// An absent or empty list on either side places no constraint.
pub fn are_modalities_compatible(accepted: Option<&[String]>, supported: &[String]) -> bool {
    match accepted {
        None => true,
        Some([]) => true,
        Some(_) if supported.is_empty() => true,
        Some(accepted) => accepted.iter().any(|mode| supported.contains(mode)),
    }
}
