use certfallback::classify::RuleSet;
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    output::{print_output, render_table, Column},
};

#[derive(Debug, Serialize)]
struct RuleEntry {
    order: usize,
    name: String,
    description: String,
}

pub fn run(opts: &GlobalOptions) -> anyhow::Result<()> {
    let entries = rule_entries(&RuleSet::standard());

    print_output(&entries, opts, |entries| {
        let rows = entries.iter().map(|entry| {
            vec![
                entry.order.to_string(),
                entry.name.clone(),
                entry.description.clone(),
            ]
        });
        println!(
            "{}",
            render_table(&[Column::Order, Column::Rule, Column::Matches], rows)
        );
    })
}

fn rule_entries(rules: &RuleSet) -> Vec<RuleEntry> {
    rules
        .rules()
        .iter()
        .enumerate()
        .map(|(index, rule)| RuleEntry {
            order: index + 1,
            name: rule.name().to_string(),
            description: rule.description().to_string(),
        })
        .collect()
}
