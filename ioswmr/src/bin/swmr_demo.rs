//! SWMR CLI Demo
//!
//! Reads lines from stdin into a stream; three readers print what they get.
//! Pass a path to stream through a file instead of memory.

use std::io::{BufRead, Read};
use std::thread;

use ioswmr::{BackingStore, FileStore, MemoryStore, Reader, Swmr};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    match std::env::args().nth(1) {
        Some(path) => run(Swmr::with_store("demo-file", FileStore::create(path)?)),
        None => run(Swmr::with_store("demo-memory", MemoryStore::new())),
    }
}

fn run<S: BackingStore + 'static>(stream: Swmr<S>) -> Result<(), Box<dyn std::error::Error>> {
    let readers: Vec<_> = ["r1", "r2", "r3"]
        .into_iter()
        .map(|name| {
            let mut reader = stream.new_reader();
            (name, thread::spawn(move || read_all(name, &mut reader)))
        })
        .collect();

    println!("Enter text (empty line to quit):");
    for line in std::io::stdin().lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            break;
        }
        if let Err(e) = stream.append(trimmed.as_bytes()) {
            eprintln!("Write error: {e}");
            break;
        }
    }

    stream.close();
    println!("Writer closed");

    for (name, reader) in readers {
        if reader.join().is_err() {
            eprintln!("({name}) Error: reader thread panicked");
        }
    }
    println!("All readers completed");
    Ok(())
}

fn read_all<S: BackingStore>(name: &str, reader: &mut Reader<S>) {
    let mut buf = [0u8; 4];

    loop {
        match reader.read(&mut buf) {
            Ok(0) => {
                println!("({name}) EOF");
                break;
            }
            Ok(n) => {
                let data = String::from_utf8_lossy(&buf[..n]);
                println!("({name}): {data}");
            }
            Err(e) => {
                eprintln!("({name}) Error: {e}");
                break;
            }
        }
    }
}
