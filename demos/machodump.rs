use std::env;
use std::fs::File;
use std::io::Cursor;
use std::process::exit;

use anyhow::{Context, Result};
use memmap::Mmap;

use macho_inspect::ObjectFile;

fn main() {
    pretty_env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("error: incorrect number of arguments");
        eprintln!();
        eprintln!("usage: {} <filename>", args[0]);

        // usage has always exited clean here, unconventional as that is
        exit(0);
    }

    if let Err(err) = dump(&args[1]) {
        eprintln!("fail to process file {}, {:#}", args[1], err);

        exit(1);
    }
}

fn dump(filename: &str) -> Result<()> {
    let file = File::open(filename).with_context(|| format!("open {}", filename))?;
    let mmap = unsafe { Mmap::map(&file) }.with_context(|| format!("map {}", filename))?;
    let mut cur = Cursor::new(&mmap[..]);
    let object = ObjectFile::parse(&mut cur)?;

    print!("{}", object.header);

    for (i, command) in object.commands.iter().enumerate() {
        println!("Load command {}", i);
        print!("{}", command);
    }

    Ok(())
}
