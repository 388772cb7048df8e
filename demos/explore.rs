//! Explore the question catalog from the command line
//!
//! ```text
//! cargo run --example explore                   # list questions
//! cargo run --example explore -- 29             # answer Q29 on the built-in sample
//! cargo run --example explore -- q6 quakes.json # answer Q6 on a JSON event file
//! ```
//!
//! Set `RUST_LOG=debug` to watch the engine's row counts.

use quake_query::{EventRecord, QuestionId, RecordTable, loader};
use std::error::Error;
use std::fs::File;
use std::io::BufReader;

fn sample() -> quake_query::Result<RecordTable> {
    RecordTable::from_events(vec![
        EventRecord::new("us2011a")
            .at("2011-03-11 05:46:24")
            .location(38.297, 142.373)
            .depth(29.0)
            .mag(9.1)
            .country("Japan")
            .region("Honshu")
            .tsunami(true),
        EventRecord::new("us2011b")
            .at("2011-03-11 06:08:53")
            .location(38.1, 142.6)
            .depth(24.0)
            .mag(7.0)
            .country("Japan")
            .region("Honshu")
            .tsunami(false),
        EventRecord::new("us2011c")
            .at("2011-03-11 06:25:50")
            .location(38.0, 144.6)
            .depth(350.0)
            .mag(7.7)
            .country("Japan")
            .region("Honshu")
            .tsunami(false),
        EventRecord::new("us2010")
            .at("2010-02-27 06:34:11")
            .location(-36.122, -72.898)
            .depth(22.9)
            .mag(8.8)
            .country("Chile")
            .region("Bio-Bio")
            .tsunami(true),
        EventRecord::new("us1994")
            .at("1994-06-09 00:33:16")
            .location(-13.841, -67.553)
            .depth(631.3)
            .mag(8.2)
            .country("Bolivia")
            .region("La Paz")
            .tsunami(false),
    ])
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let Some(question) = args.first() else {
        println!("=== Question catalog ===\n");
        for (id, title) in quake_query::list_questions() {
            println!("  {:>4}  {}", id, title);
        }
        return Ok(());
    };

    let id: QuestionId = question.parse()?;
    let table = match args.get(1) {
        Some(path) => loader::from_json_reader(BufReader::new(File::open(path)?))?,
        None => sample()?,
    };

    let title = quake_query::Catalog::builtin().get(id)?.title.clone();
    println!("=== {}: {} ({} events) ===\n", id, title, table.len());

    let result = quake_query::run(id, &table)?;
    println!("{}", result);

    Ok(())
}
