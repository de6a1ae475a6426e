// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use clap::Parser;

fn main() {
    let args = aegean::AegeanArgs::parse();
    if let Err(e) = aegean::cli::run(args) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
