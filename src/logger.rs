// License below.
//! A combined console and file logger behind the `log` facade.
#![warn(missing_docs)]

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Logs to stdout, optionally colourised, and mirrors everything
/// into a log file.
pub struct ConsoleFileLogger {
    file: Option<Mutex<File>>,
    verbose: bool,
    colour: bool,
}

impl Log for ConsoleFileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        let max_level = if self.verbose { Level::Trace } else { Level::Info };
        metadata.level() <= max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) { return; }

        // Prepare some common message sections in case of colouring.
        let loc = format!("[{}:{} - {}]",
            record.file().unwrap_or("<?>"),
            record.line().unwrap_or(0),
            record.module_path().unwrap_or("<?>"));
        let fmt = format!("{}", record.args()).replace('\n', "\n\t\t   ");

        // Log to file.
        if let Some(f) = self.file.as_ref() {
            let mut tmp = f.lock().unwrap();
            writeln!(&mut *tmp, "{}\t{}\n\t\t-- {}\n", record.level(), loc, fmt).unwrap_or(());
        }

        // Log to stdout.
        if !self.colour {
            println!("{}\t{}\n\t\t-- {}\n", record.level(), loc, fmt);
        } else {
            // Colourising is only done for terminals.
            println!(
                "\x1B[0m{}{}\x1B[0m\x1B[2m\t{}\x1B[1m\n\t\t-- {}\x1B[0m\n",
                match record.level() {
                    Level::Error => "\x1B[31m\x1B[1m", // Bold, red.
                    Level::Warn  => "\x1B[33m\x1B[1m", // Bold, yellow.
                    Level::Info  => "\x1B[32m\x1B[1m", // Bold, green.
                    _            => "\x1B[34m\x1B[1m", // Bold, blue.
                },
                record.level(), loc, fmt
            );
        }
    }

    fn flush(&self) {
        if let Some(f) = self.file.as_ref() {
            f.lock().unwrap().flush().unwrap_or(());
        }
    }
}

/// Installs the logger for the rest of the process lifetime.
///
/// # Params
/// - `file`: Path of the mirror log file.
/// - `verbose`: Log everything down to trace level if `true`.
/// - `colour`: Colourise the console output with ANSI codes.
pub fn init_with(file: &Path, verbose: bool, colour: bool) -> Result<(), SetLoggerError> {
    let logger = ConsoleFileLogger {
        file: File::create(file).ok().map(Mutex::new),
        verbose,
        colour,
    };
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(LevelFilter::Trace);
    Ok(())
}


/*
Licensed to the Apache Software Foundation (ASF) under one
or more contributor license agreements.  See the NOTICE file
distributed with this work for additional information
regarding copyright ownership.  The ASF licenses this file
to you under the Apache License, Version 2.0 (the
"License"); you may not use this file except in compliance
with the License.  You may obtain a copy of the License at

  http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing,
software distributed under the License is distributed on an
"AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
KIND, either express or implied.  See the License for the
specific language governing permissions and limitations
under the License.
*/
