//! Example: Encoding Plain Values and Typed Objects
//!
//! This example encodes a small tree of plain values, a typed object through
//! a registered adapter, and a sequence in stream mode, printing the sizes and
//! hex of each encoding.
//!
//! Run with: `cargo run --example roundtrip_demo`

#![allow(clippy::uninlined_format_args)]

use boss_codec::config::CodecConfig;
use boss_codec::utils::init_logging;
use boss_codec::{
    dump, dump_with, load, load_with, BiAdapter, Binder, Deserializer, Mapper, Reader, Result,
    Serializer, Value, Writer,
};
use std::io::Cursor;

#[derive(Debug, PartialEq)]
struct Sensor {
    name: String,
    reading: f64,
}

struct SensorAdapter;

impl BiAdapter<Sensor> for SensorAdapter {
    fn type_name(&self) -> &str {
        "sensor"
    }

    fn encode(&self, s: &Sensor, _: &mut Serializer) -> Result<Binder> {
        Ok(Binder::new()
            .with("name", s.name.as_str())
            .with("reading", s.reading))
    }

    fn decode(&self, b: &Binder, _: &mut Deserializer) -> Result<Sensor> {
        Ok(Sensor {
            name: b.get_str_or_err("name")?.to_string(),
            reading: b.get_f64_or_err("reading")?,
        })
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let config = CodecConfig::from_env()?;
    config.validate_strict()?;
    init_logging(&config.logging)?;

    println!("=== BOSS Round Trip Demo ===\n");

    // 1. Plain values
    let shared = Value::list(["Hello", "World"]);
    let tree = Value::dict(
        Binder::new()
            .with("greeting", shared.clone())
            .with("again", shared)
            .with("answer", 42)
            .with("when", Value::timestamp_secs(1375965738).unwrap_or_default()),
    );
    let bytes = dump(&tree)?;
    println!("1. PLAIN TREE");
    println!("   - Encoded size: {} bytes", bytes.len());
    println!("   - Hex: {:02X?}", bytes);
    let decoded = load(&bytes)?;
    println!("   - Roundtrip: {}", if decoded == tree { "ok" } else { "MISMATCH" });
    print!("{}", decoded.trace());
    println!();

    // 2. Typed object
    let mapper = Mapper::new();
    mapper.register(SensorAdapter)?;
    let sensor = Sensor {
        name: "boiler".to_string(),
        reading: 81.5,
    };
    let bytes = dump_with(&Value::object(sensor), &mapper)?;
    println!("2. TYPED OBJECT");
    println!("   - Encoded size: {} bytes", bytes.len());
    let decoded = load_with(&bytes, &mapper)?;
    println!("   - Decoded: {:?}", decoded.downcast_ref::<Sensor>());
    println!();

    // 3. Stream mode
    let mut writer = Writer::with_config(Vec::new(), &config);
    writer.set_stream_mode()?;
    for i in 0..20 {
        writer.write(&Value::from(format!("tick-{}", i % 4)))?;
    }
    let stats = writer.stats();
    let bytes = writer.into_inner();
    println!("3. STREAM MODE");
    println!(
        "   - Encoded size: {} bytes, cache entries: {}, hits: {}",
        bytes.len(),
        stats.entries,
        stats.hits
    );
    let mut reader = Reader::with_config(Cursor::new(bytes), &config);
    let mut count = 0;
    while reader.try_read()?.is_some() {
        count += 1;
    }
    println!("   - Values read back: {}", count);

    Ok(())
}
