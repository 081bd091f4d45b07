use time::OffsetDateTime;
use time::format_description;

/// Export `name` to the crate, formatted from `at` unless set in the environment.
fn stamp(name: &str, pattern: &str, at: OffsetDateTime) {
    println!("cargo:rerun-if-env-changed={name}");
    let value = std::env::var(name).ok().or_else(|| {
        let items = format_description::parse(pattern).ok()?;
        at.format(&items).ok()
    });
    println!("cargo:rustc-env={name}={}", value.as_deref().unwrap_or("unknown"));
}

fn main() {
    // Reproducible builds pin the clock.
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    let at = std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|secs| secs.trim().parse::<i64>().ok())
        .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
        .unwrap_or_else(OffsetDateTime::now_utc);

    stamp("RESIO_BUILD_DATE", "[month repr:short] [day padding:space] [year]", at);
    stamp("RESIO_BUILD_TIME", "[hour]:[minute]:[second]", at);
}
