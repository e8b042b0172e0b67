/// Writes an error and its chain of sources, one cause per line
///
/// Used to implement `Debug` on our error enums: the default derive only
/// prints the top-level variant, losing the underlying causes.
pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;

    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }

    Ok(())
}
