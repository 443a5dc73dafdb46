fn main() {
    // Wire up the ESP-IDF build environment only when the firmware binary
    // is being built; host-side lib/test builds skip it entirely.
    if std::env::var_os("CARGO_FEATURE_ESPIDF").is_some() {
        embuild::espidf::sysenv::output();
    }
}
