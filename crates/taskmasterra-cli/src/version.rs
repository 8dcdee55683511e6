pub const FULL: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "+git.",
    env!("TASKMASTERRA_GIT_COUNT"),
    ".",
    env!("TASKMASTERRA_GIT_SHA"),
    env!("TASKMASTERRA_GIT_DIRTY")
);

#[cfg(test)]
mod tests {
    use super::FULL;

    #[test]
    fn version_leads_with_package_version() {
        let rest = FULL
            .strip_prefix(env!("CARGO_PKG_VERSION"))
            .expect("package version prefix");
        assert!(rest.starts_with("+git."), "unexpected version string: {FULL}");
        assert!(rest.contains(env!("TASKMASTERRA_GIT_SHA")));
    }
}
