use anyhow::Context as _;
use minijinja::Environment;

use crate::foundation::error::MemeResult;

// Templates ship inside the binary; a parse failure here is a packaging
// defect surfaced at startup, not a per-request condition.
const TEMPLATES: [(&str, &str); 4] = [
    ("index.html", include_str!("../../web/templates/index.html")),
    (
        "generation.html",
        include_str!("../../web/templates/generation.html"),
    ),
    (
        "history.html",
        include_str!("../../web/templates/history.html"),
    ),
    (
        "settings.html",
        include_str!("../../web/templates/settings.html"),
    ),
];

/// Build the template environment used by all views.
pub fn environment() -> MemeResult<Environment<'static>> {
    let mut env = Environment::new();
    for (name, source) in TEMPLATES {
        env.add_template(name, source)
            .with_context(|| format!("failed to parse template '{name}'"))?;
    }
    Ok(env)
}
