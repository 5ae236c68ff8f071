use clap::{arg_enum, value_t, App, Arg};
use crossbeam_utils::thread::scope;
use csv::Writer;
use rand::distributions::{Uniform, WeightedIndex};
use rand::prelude::*;
use std::fs::{create_dir_all, File, OpenOptions};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use hazlist::{CoarseList, ConcurrentSet, List, TaggedList};

arg_enum! {
    #[derive(PartialEq, Debug)]
    pub enum DS {
        LockFree,
        Tagged,
        Coarse,
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
enum Op {
    Find,
    Insert,
    Remove,
}

impl Op {
    const OPS: [Op; 3] = [Op::Find, Op::Insert, Op::Remove];
}

struct Config {
    ds: DS,
    threads: usize,
    get_rate: usize,
    op_dist: WeightedIndex<i32>,
    key_dist: Uniform<usize>,
    prefill: usize,
    interval: u64,
    duration: Duration,
}

fn main() {
    let matches = App::new("hazlist-bench")
        .arg(
            Arg::with_name("data structure")
                .short("d")
                .value_name("DS")
                .possible_values(&DS::variants())
                .required(true)
                .case_insensitive(true)
                .help("Set implementation to measure"),
        )
        .arg(
            Arg::with_name("threads")
                .short("t")
                .value_name("THREADS")
                .takes_value(true)
                .required(true)
                .help("Number of worker threads"),
        )
        .arg(
            Arg::with_name("get rate")
                .short("g")
                .takes_value(true)
                .help(
                    "The proportion of `find`(read) operations. \
                     0: 0%, 1: 50%, 2: 90%",
                )
                .possible_values(&["0", "1", "2"])
                .default_value("0"),
        )
        .arg(
            Arg::with_name("range")
                .short("r")
                .value_name("RANGE")
                .takes_value(true)
                .help("Key range: [0..RANGE]")
                .default_value("2000"),
        )
        .arg(
            Arg::with_name("interval")
                .short("i")
                .value_name("INTERVAL")
                .takes_value(true)
                .help("Time interval in seconds to run the benchmark")
                .default_value("10"),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .value_name("OUTPUT")
                .takes_value(true)
                .help(
                    "Output CSV filename. \
                     Appends the data if the file already exists.\n\
                     [default: results/<DS>.csv]",
                ),
        )
        .get_matches();

    let ds = value_t!(matches, "data structure", DS).unwrap();
    let threads = value_t!(matches, "threads", usize).unwrap();
    let get_rate = value_t!(matches, "get rate", usize).unwrap();
    let range = value_t!(matches, "range", usize).unwrap();
    let interval = value_t!(matches, "interval", u64).unwrap();

    let op_weights = match get_rate {
        0 => &[0, 1, 1],
        1 => &[2, 1, 1],
        _ => &[18, 1, 1],
    };

    let output_name = matches
        .value_of("output")
        .map_or(format!("results/{}.csv", ds), |o| o.to_string());
    create_dir_all("results").unwrap();
    let mut output = match OpenOptions::new().append(true).open(&output_name) {
        Ok(f) => Writer::from_writer(f),
        Err(_) => {
            let f = OpenOptions::new()
                .write(true)
                .create(true)
                .open(&output_name)
                .unwrap();
            let mut output = Writer::from_writer(f);
            output
                .write_record(["ds", "threads", "get_rate", "range", "interval", "throughput"])
                .unwrap();
            output.flush().unwrap();
            output
        }
    };

    let config = Config {
        ds,
        threads,
        get_rate,
        op_dist: WeightedIndex::new(op_weights).unwrap(),
        key_dist: Uniform::from(0..range),
        prefill: range / 2,
        interval,
        duration: Duration::from_secs(interval),
    };

    let throughput = match config.ds {
        DS::LockFree => bench::<List<usize>>(&config),
        DS::Tagged => bench::<TaggedList<usize>>(&config),
        DS::Coarse => bench::<CoarseList<usize>>(&config),
    };

    println!(
        "{}: {} threads, g{}, {} ops/sec",
        config.ds, config.threads, config.get_rate, throughput as u64
    );
    report(&mut output, &config, throughput);
}

fn report(output: &mut Writer<File>, config: &Config, throughput: f64) {
    output
        .write_record([
            config.ds.to_string(),
            config.threads.to_string(),
            config.get_rate.to_string(),
            config.prefill.to_string(),
            config.interval.to_string(),
            throughput.to_string(),
        ])
        .unwrap();
    output.flush().unwrap();
}

fn bench<S: ConcurrentSet<usize>>(config: &Config) -> f64 {
    let set = S::new();

    let mut rng = rand::thread_rng();
    for _ in 0..config.prefill {
        set.insert(config.key_dist.sample(&mut rng));
    }

    let (sender, receiver) = mpsc::channel();
    scope(|s| {
        let set = &set;
        for _ in 0..config.threads {
            let sender = sender.clone();
            s.spawn(move |_| {
                let mut rng = rand::thread_rng();
                let mut ops: u64 = 0;
                let start = Instant::now();
                while start.elapsed() < config.duration {
                    let key = config.key_dist.sample(&mut rng);
                    match Op::OPS[config.op_dist.sample(&mut rng)] {
                        Op::Find => {
                            set.find(key);
                        }
                        Op::Insert => {
                            set.insert(key);
                        }
                        Op::Remove => {
                            set.remove(key);
                        }
                    }
                    ops += 1;
                }
                sender.send(ops).unwrap();
            });
        }
    })
    .unwrap();
    drop(sender);

    let total: u64 = receiver.iter().sum();
    total as f64 / config.interval as f64
}
