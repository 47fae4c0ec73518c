#![no_main]

use libfuzzer_sys::fuzz_target;
use ply_table_rs::{Container, ReadOptions};

fuzz_target!(|data: &[u8]| {
    let cursor = std::io::Cursor::new(data);
    let _ = Container::read(cursor, &ReadOptions::default());
});
