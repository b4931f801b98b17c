// src/cli/scenarios.rs — `parlay scenarios`

use crate::scenario::ScenarioCatalog;

pub fn show_scenarios(catalog: &ScenarioCatalog) {
    println!("{}", render_table(catalog));
}

fn render_table(catalog: &ScenarioCatalog) -> String {
    let default = catalog.default_scenario();
    let mut out = String::new();
    for s in catalog.all() {
        let marker = if s.scenario_code == default.scenario_code {
            " (default)"
        } else {
            ""
        };
        out.push_str(&format!(
            "{:<22} {} [{} step(s), {}]{}\n",
            s.scenario_code,
            s.title,
            s.step_count(),
            s.language,
            marker
        ));
        if !s.aliases.is_empty() {
            out.push_str(&format!("{:<22} aliases: {}\n", "", s.aliases.join(", ")));
        }
    }
    out.trim_end().to_string()
}
