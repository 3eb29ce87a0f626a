use colored::Colorize;
use omcs_api::{Issue, Label};
use omcs_search::{Collection, DisplayField, Hit, ResultGroup, SearchView};

const SNIPPET_WIDTH: usize = 72;

/// Matched segments in bold yellow, the rest as-is.
pub fn styled(field: &DisplayField) -> String {
    field
        .segments()
        .into_iter()
        .map(|(text, matched)| {
            if matched {
                text.yellow().bold().to_string()
            } else {
                text.to_string()
            }
        })
        .collect()
}

/// First line of `text`, cut to a width that fits a result row.
fn snippet(text: &str) -> String {
    let line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim();
    if line.chars().count() <= SNIPPET_WIDTH {
        return line.to_string();
    }
    let cut: String = line.chars().take(SNIPPET_WIDTH - 3).collect();
    format!("{}...", cut)
}

pub fn hit_lines(collection: Collection, hit: &Hit) -> Vec<String> {
    let title = hit
        .primary(collection)
        .map(styled)
        .unwrap_or_else(|| hit.id.clone());
    let route = collection.route(&hit.id);
    let mut lines = vec![format!("  {} {}", title, route.to_string().dimmed())];

    if let Some(secondary) = hit.secondary(collection).filter(|f| !f.plain.is_empty()) {
        lines.push(format!("    {}", snippet(&secondary.plain).dimmed()));
    }
    lines
}

pub fn group_lines(group: &ResultGroup<'_>) -> Vec<String> {
    let mut lines = vec![group.label.bold().to_string()];
    for hit in group.hits {
        lines.extend(hit_lines(group.collection, hit));
    }
    lines
}

pub fn view_lines(view: &SearchView<'_>) -> Vec<String> {
    match view {
        SearchView::Loading => vec!["Searching...".dimmed().to_string()],
        SearchView::NoResults => vec!["No Results".yellow().to_string()],
        SearchView::Groups(groups) => {
            let mut lines = Vec::new();
            for (i, group) in groups.iter().enumerate() {
                if i > 0 {
                    lines.push(String::new());
                }
                lines.extend(group_lines(group));
            }
            lines
        }
    }
}

pub fn issue_line(issue: &Issue) -> String {
    let labels: Vec<&str> = issue.labels.iter().map(|l| l.name.as_str()).collect();
    let mut line = format!("{} {}", format!("#{}", issue.number).cyan(), issue.title);
    if !labels.is_empty() {
        line.push_str(&format!(" {}", format!("[{}]", labels.join(", ")).dimmed()));
    }
    line
}

pub fn label_line(label: &Label) -> String {
    match label.description.as_deref().filter(|d| !d.is_empty()) {
        Some(description) => format!("{} {}", label.name.green(), snippet(description).dimmed()),
        None => label.name.green().to_string(),
    }
}
