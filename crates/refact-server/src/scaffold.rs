//! Starter file sets for new projects

use refact_core::{Complexity, Result};
use refact_workspace::Workspace;

/// Build the starter workspace for a new project
///
/// Simple projects get a README, `package.json` and `src/index.js`. Complex
/// ones add an `App` component and a stylesheet, wired up from the entry point.
pub fn scaffold(name: &str, complexity: Complexity) -> Result<Workspace> {
    let mut files = vec![
        ("README.md", readme(name)),
        ("package.json", package_json(name)?),
    ];

    match complexity {
        Complexity::Simple => {
            files.push((
                "src/index.js",
                format!("console.log(\"Hello from {}\");\n", name),
            ));
        }
        Complexity::Complex => {
            files.push((
                "src/index.js",
                "import App from './components/App';\nimport './styles/main.css';\n\nApp();\n"
                    .to_string(),
            ));
            files.push((
                "src/components/App.js",
                format!(
                    "export default function App() {{\n  console.log(\"{} is running\");\n}}\n",
                    name
                ),
            ));
            files.push((
                "src/styles/main.css",
                "body {\n  margin: 0;\n  font-family: sans-serif;\n}\n".to_string(),
            ));
        }
    }

    Workspace::from_files(files)
}

fn readme(name: &str) -> String {
    format!(
        "# {}\n\nCreated with refact. Describe a change in chat and the agent will commit it.\n",
        name
    )
}

fn package_json(name: &str) -> Result<String> {
    let manifest = serde_json::json!({
        "name": package_name(name),
        "version": "0.1.0",
        "private": true,
        "main": "src/index.js",
        "scripts": { "start": "node src/index.js" }
    });
    Ok(serde_json::to_string_pretty(&manifest)? + "\n")
}

/// npm package names are lowercase with no spaces
fn package_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '-',
        })
        .collect()
}
