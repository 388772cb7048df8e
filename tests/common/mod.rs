#![allow(dead_code)]

use quake_query::{EventRecord, RecordTable};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A small hand-written catalog touching every question.
pub fn sample_events() -> Vec<EventRecord> {
    vec![
        EventRecord::new("jp2011")
            .at("2011-03-11 05:46:24")
            .location(38.297, 142.373)
            .depth(29.0)
            .mag(9.1)
            .mag_type("mww")
            .net("us")
            .status("reviewed")
            .event_type("earthquake")
            .types("origin,phase-data")
            .alert("red")
            .place("Near the east coast of Honshu")
            .country("Japan")
            .continent("Asia")
            .region("Honshu")
            .casualties(18_500.0)
            .economic_loss(235_000.0)
            .nst(541)
            .gap(9.5)
            .rms(1.2)
            .tsunami(true),
        EventRecord::new("jp2011b")
            .at("2011-03-11 06:15:40")
            .location(36.281, 141.111)
            .depth(42.6)
            .mag(7.9)
            .mag_type("mww")
            .net("us")
            .status("reviewed")
            .event_type("earthquake")
            .place("Off the east coast of Honshu")
            .country("Japan")
            .continent("Asia")
            .region("Honshu")
            .nst(120)
            .rms(0.9)
            .tsunami(false),
        EventRecord::new("jp2011c")
            .at("2011-03-11 06:25:50")
            .location(38.0, 144.6)
            .depth(350.0)
            .mag(7.7)
            .net("us")
            .status("reviewed")
            .country("Japan")
            .continent("Asia")
            .region("Honshu")
            .tsunami(false),
        EventRecord::new("cl2010")
            .at("2010-02-27 06:34:11")
            .location(-36.122, -72.898)
            .depth(22.9)
            .mag(8.8)
            .mag_type("mww")
            .net("us")
            .status("reviewed")
            .event_type("earthquake")
            .alert("red")
            .place("Offshore Bio-Bio, Chile")
            .country("Chile")
            .continent("South America")
            .region("Bio-Bio")
            .casualties(525.0)
            .economic_loss(30_000.0)
            .nst(300)
            .gap(17.0)
            .rms(1.1)
            .tsunami(true),
        EventRecord::new("cl2015")
            .at("2015-09-16 22:54:32")
            .location(-31.573, -71.674)
            .depth(22.4)
            .mag(8.3)
            .mag_type("mww")
            .net("us")
            .status("reviewed")
            .alert("orange")
            .place("Illapel, Chile")
            .country("Chile")
            .continent("South America")
            .region("Coquimbo")
            .casualties(13.0)
            .tsunami(true),
        EventRecord::new("bo1994")
            .at("1994-06-09 00:33:16")
            .location(-13.841, -67.553)
            .depth(631.3)
            .mag(8.2)
            .net("us")
            .status("reviewed")
            .country("Bolivia")
            .continent("South America")
            .region("La Paz")
            .tsunami(false),
        EventRecord::new("id2004")
            .at("2004-12-26 00:58:53")
            .location(3.295, 95.982)
            .depth(30.0)
            .mag(9.1)
            .mag_type("mw")
            .net("us")
            .status("reviewed")
            .alert("red")
            .place("Off the west coast of northern Sumatra")
            .country("Indonesia")
            .continent("Asia")
            .region("Sumatra")
            .casualties(227_898.0)
            .gap(22.0)
            .tsunami(true),
        EventRecord::new("id2004b")
            .at("2004-12-26 04:21:29")
            .location(6.91, 92.958)
            .depth(39.0)
            .mag(7.2)
            .net("us")
            .status("automatic")
            .country("Indonesia")
            .continent("Asia")
            .region("Nicobar")
            .tsunami(false),
        EventRecord::new("id2018")
            .at("2018-08-19 00:19:40")
            .location(-8.319, 116.627)
            .depth(21.0)
            .mag(6.9)
            .net("us")
            .status("reviewed")
            .country("Indonesia")
            .continent("Asia")
            .region("Lombok")
            .tsunami(false),
        EventRecord::new("fj2018")
            .at("2018-08-19 00:19:37")
            .location(-18.113, -178.153)
            .depth(600.0)
            .mag(8.2)
            .net("us")
            .status("reviewed")
            .country("Fiji")
            .continent("Oceania")
            .region("Fiji")
            .tsunami(false),
        EventRecord::new("ak1964")
            .at("1964-03-28 03:36:16")
            .location(60.908, -147.339)
            .depth(25.0)
            .mag(9.2)
            .net("ak")
            .status("reviewed")
            .place("Prince William Sound, Alaska")
            .country("United States")
            .continent("North America")
            .region("Alaska")
            .tsunami(true),
        EventRecord::new("ec1906")
            .at("1906-01-31 15:36:10")
            .location(0.955, -79.369)
            .depth(20.0)
            .mag(8.8)
            .net("iscgem")
            .status("reviewed")
            .country("Ecuador")
            .continent("South America")
            .region("Esmeraldas")
            .tsunami(true),
        EventRecord::new("nowhere")
            .at("not a timestamp")
            .depth(15.0)
            .mag(5.0)
            .net("us")
            .status("automatic"),
        EventRecord::new("quiet").location(0.0, 0.0).depth(10.0),
    ]
}

pub fn sample_table() -> RecordTable {
    RecordTable::from_events(sample_events()).expect("sample events are valid")
}

/// `n` events clustered in a few hot spots over a few days, with some
/// simultaneous timestamps and a sprinkling of nulls.
pub fn synthetic_events(n: usize, seed: u64) -> Vec<EventRecord> {
    const HOT_SPOTS: [(f64, f64); 4] = [(38.0, 142.0), (-33.0, -72.0), (-18.0, 179.8), (61.0, -147.0)];
    const COUNTRIES: [&str; 4] = ["Japan", "Chile", "Fiji", "United States"];

    let mut rng = StdRng::seed_from_u64(seed);
    let start = chrono::DateTime::parse_from_rfc3339("2020-01-01T00:00:00Z")
        .expect("valid timestamp")
        .with_timezone(&chrono::Utc);

    (0..n)
        .map(|i| {
            let spot = rng.gen_range(0..HOT_SPOTS.len());
            let (lat, lon) = HOT_SPOTS[spot];
            // Whole minutes, so equal timestamps occur.
            let minutes = rng.gen_range(0..5 * 24 * 60);

            let mut event = EventRecord::new(format!("ev{:05}", i))
                .time(start + chrono::TimeDelta::minutes(minutes))
                .location(lat + rng.gen_range(-0.6..0.6), lon + rng.gen_range(-0.6..0.6))
                .depth(rng.gen_range(5.0..650.0))
                .net(if i % 3 == 0 { "us" } else { "ak" })
                .tsunami(i % 7 == 0);

            if i % 11 != 0 {
                event = event.mag(rng.gen_range(4.0..9.0)).country(COUNTRIES[spot]);
            }
            if i % 13 == 0 {
                event.latitude = None;
            }
            event
        })
        .collect()
}

pub fn synthetic_table(n: usize, seed: u64) -> RecordTable {
    RecordTable::from_events(synthetic_events(n, seed)).expect("synthetic events are valid")
}
