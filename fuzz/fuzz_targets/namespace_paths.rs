#![no_main]
use libfuzzer_sys::fuzz_target;
use quiver::{Context, Value};

fuzz_target!(|data: &[u8]| {
    // Fuzz namespace writes and reads with arbitrary paths
    // Traversal must never panic; failures surface as structured errors

    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let (path, payload) = match text.split_once('=') {
        Some((path, payload)) => (path, payload),
        None => (text, "x"),
    };

    let context = Context::new();
    let written = context.write(path, Value::from(payload)).is_ok();
    let read = context.read(path);

    // Dot-free paths split identically on both sides, so a successful write
    // must read back.
    if written && !path.contains('.') {
        assert_eq!(read, Ok(Value::from(payload)));
    }

    // Dotted reads against the same tree may miss but must not panic.
    let _ = context.read(&path.replace('/', "."));
});
