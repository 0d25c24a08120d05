// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::SectionRegistry;
use crate::utils::pretty_table;
use anyhow::Result;

pub fn handle(m: &clap::ArgMatches) -> Result<()> {
    let registry = SectionRegistry::default_location()?;
    match m.subcommand() {
        Some(("list", _)) => {
            let keys = registry.section_keys()?;
            let data = keys.into_iter().map(|k| vec![k]).collect();
            println!("{}", pretty_table(&["Section"], data));
            println!("Mapping file: {}", registry.path().display());
        }
        Some(("show", sub)) => {
            let key = sub.get_one::<String>("key").unwrap();
            let groups = registry.section(key)?;
            let mut data = Vec::new();
            for (group, normalized) in groups {
                data.push(vec![
                    group,
                    normalized.label.unwrap_or_default(),
                    normalized.accounts.join(", "),
                ]);
            }
            println!("{}", pretty_table(&["Group", "Label", "Accounts"], data));
        }
        _ => {}
    }
    Ok(())
}
