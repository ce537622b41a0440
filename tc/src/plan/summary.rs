//! Human-readable plan preview
//!
//! Turns a [`Plan`] into titled sections, one per non-empty operation kind,
//! each listing short item descriptions. Long sections are capped until the
//! preview is expanded; the raw JSON can be shown independently.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::{Plan, TaskRef};

/// Items shown per section before the preview is expanded
pub const DEFAULT_PREVIEW_LIMIT: usize = 6;

const UNTITLED: &str = "(без названия)";

/// Kind of mutation a section groups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    CreateCategories,
    CreateTasks,
    UpdateCategories,
    UpdateTasks,
    DeleteCategories,
    DeleteTasks,
}

impl OperationKind {
    /// Section heading
    pub fn title(&self) -> &'static str {
        match self {
            Self::CreateCategories => "Создать категории",
            Self::CreateTasks => "Создать задачи",
            Self::UpdateCategories => "Обновить категории",
            Self::UpdateTasks => "Обновить задачи",
            Self::DeleteCategories => "Удалить категории",
            Self::DeleteTasks => "Удалить задачи",
        }
    }
}

/// One titled group of item descriptions
#[derive(Debug, Clone, PartialEq)]
pub struct SummarySection {
    pub kind: OperationKind,
    pub items: Vec<String>,
}

impl SummarySection {
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// Heading with the item count, e.g. "Удалить задачи (2)"
    pub fn heading(&self) -> String {
        format!("{} ({})", self.kind.title(), self.count())
    }
}

/// Sections of a plan in a fixed order, empty kinds omitted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanSummary {
    pub sections: Vec<SummarySection>,
}

impl PlanSummary {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn total_items(&self) -> usize {
        self.sections.iter().map(SummarySection::count).sum()
    }

    pub fn section(&self, kind: OperationKind) -> Option<&SummarySection> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    /// Render as lines; `limit` caps the items listed per section
    pub fn render_lines(&self, limit: Option<usize>) -> Vec<String> {
        let mut lines = Vec::new();
        for section in &self.sections {
            lines.push(section.heading());
            let shown = limit.unwrap_or(usize::MAX).min(section.count());
            for item in &section.items[..shown] {
                lines.push(format!("  - {}", item));
            }
            let hidden = section.count() - shown;
            if hidden > 0 {
                lines.push(format!("  … ещё {}", hidden));
            }
        }
        lines
    }

    /// True when some section has more items than `limit`
    pub fn is_capped(&self, limit: usize) -> bool {
        self.sections.iter().any(|s| s.count() > limit)
    }
}

/// Build the preview sections for a plan
pub fn summarize(plan: &Plan) -> PlanSummary {
    let mut sections = Vec::new();
    let mut push = |kind: OperationKind, items: Vec<String>| {
        if !items.is_empty() {
            sections.push(SummarySection { kind, items });
        }
    };

    push(
        OperationKind::CreateCategories,
        plan.categories
            .iter()
            .map(|c| {
                let mut line = label(&c.name);
                if let Some(color) = non_empty(c.color.as_deref()) {
                    line.push_str(&format!(" ({})", color));
                }
                line
            })
            .collect(),
    );

    push(
        OperationKind::CreateTasks,
        plan.tasks
            .iter()
            .map(|t| {
                let mut line = label(&t.title);
                if let Some(priority) = t.priority {
                    line.push_str(&format!(" • {}", priority));
                }
                if let Some(deadline) = non_empty(t.deadline.as_deref()) {
                    line.push_str(&format!(" • {}", format_deadline(deadline)));
                }
                if let Some(category) = non_empty(t.category.as_deref()) {
                    line.push_str(&format!(" • {}", category));
                }
                line
            })
            .collect(),
    );

    push(
        OperationKind::UpdateCategories,
        plan.update_categories
            .iter()
            .map(|u| {
                let mut line = label(&u.name);
                if let Some(new_name) = non_empty(u.new_name.as_deref()) {
                    line.push_str(&format!(" → {}", new_name));
                }
                if let Some(color) = non_empty(u.color.as_deref()) {
                    line.push_str(&format!(" • {}", color));
                }
                if u.description.is_some() {
                    line.push_str(" • описание");
                }
                line
            })
            .collect(),
    );

    push(
        OperationKind::UpdateTasks,
        plan.update_tasks
            .iter()
            .map(|u| {
                let mut line = target_label(u.target.as_ref());
                if let Some(title) = non_empty(u.title.as_deref()) {
                    line.push_str(&format!(" • название → {}", title));
                }
                if let Some(priority) = u.priority {
                    line.push_str(&format!(" • {}", priority));
                }
                if let Some(deadline) = non_empty(u.deadline.as_deref()) {
                    line.push_str(&format!(" • {}", format_deadline(deadline)));
                }
                if let Some(category) = non_empty(u.category.as_deref()) {
                    line.push_str(&format!(" • {}", category));
                }
                match u.is_done {
                    Some(true) => line.push_str(" • выполнить"),
                    Some(false) => line.push_str(" • вернуть в работу"),
                    None => {}
                }
                line
            })
            .collect(),
    );

    push(
        OperationKind::DeleteCategories,
        plan.delete_categories.iter().map(|d| label(&d.name)).collect(),
    );

    push(
        OperationKind::DeleteTasks,
        plan.delete_tasks.iter().map(|d| target_label(d.target.as_ref())).collect(),
    );

    PlanSummary { sections }
}

/// Preview state: the summary plus its two independent toggles
#[derive(Debug, Clone)]
pub struct PlanPreview {
    summary: PlanSummary,
    raw_json: String,
    limit: usize,
    expanded: bool,
    show_raw: bool,
}

impl PlanPreview {
    pub fn new(plan: &Plan, limit: usize) -> Self {
        Self {
            summary: summarize(plan),
            raw_json: plan.to_pretty_json(),
            limit: limit.max(1),
            expanded: false,
            show_raw: false,
        }
    }

    pub fn with_raw(mut self, show_raw: bool) -> Self {
        self.show_raw = show_raw;
        self
    }

    pub fn summary(&self) -> &PlanSummary {
        &self.summary
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn shows_raw(&self) -> bool {
        self.show_raw
    }

    /// Flip between the capped and the full listing
    pub fn toggle_expanded(&mut self) -> bool {
        self.expanded = !self.expanded;
        self.expanded
    }

    /// Flip the raw JSON dump on or off
    pub fn toggle_raw(&mut self) -> bool {
        self.show_raw = !self.show_raw;
        self.show_raw
    }

    /// True when expanding would reveal more items
    pub fn can_expand(&self) -> bool {
        self.summary.is_capped(self.limit)
    }

    pub fn render(&self) -> String {
        let limit = if self.expanded { None } else { Some(self.limit) };
        let mut lines = self.summary.render_lines(limit);
        if self.show_raw {
            lines.push(String::new());
            lines.push(self.raw_json.clone());
        }
        lines.join("\n")
    }
}

/// Format a deadline as `dd.mm.yyyy HH:MM`
///
/// Accepts RFC 3339, ISO-8601 without offset, plain dates and the
/// `dd.mm.yyyy[ HH:MM]` form. Times with an offset are shown in that offset.
/// Unrecognized text is returned as is.
pub fn format_deadline(raw: &str) -> String {
    let value = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return dt.format("%d.%m.%Y %H:%M").to_string();
    }

    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%d.%m.%Y %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, pattern) {
            return dt.format("%d.%m.%Y %H:%M").to_string();
        }
    }

    for pattern in ["%Y-%m-%d", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, pattern) {
            return date.format("%d.%m.%Y").to_string();
        }
    }

    value.to_string()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn label(name: &str) -> String {
    non_empty(Some(name)).unwrap_or(UNTITLED).to_string()
}

fn target_label(target: Option<&TaskRef>) -> String {
    match target {
        Some(TaskRef::ById(id)) => format!("#{}", id),
        Some(TaskRef::ByTitle(title)) => title.clone(),
        None => UNTITLED.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plan(value: serde_json::Value) -> Plan {
        Plan::from_value(value).unwrap()
    }

    #[test]
    fn test_delete_tasks_section() {
        let summary = summarize(&plan(json!({ "delete_tasks": [{ "title": "A" }, { "title": "B" }] })));

        assert_eq!(summary.sections.len(), 1);
        let section = summary.section(OperationKind::DeleteTasks).unwrap();
        assert_eq!(section.heading(), "Удалить задачи (2)");
        assert_eq!(section.items, vec!["A", "B"]);
    }

    #[test]
    fn test_empty_sections_omitted() {
        let summary = summarize(&plan(json!({ "categories": [], "tasks": [], "delete_tasks": null })));
        assert!(summary.is_empty());
        assert!(summary.render_lines(None).is_empty());
    }

    #[test]
    fn test_section_order_is_fixed() {
        let summary = summarize(&plan(json!({
            "delete_tasks": [{ "id": 1 }],
            "categories": [{ "name": "Работа" }],
            "update_tasks": [{ "id": 2, "is_done": true }]
        })));

        let kinds: Vec<_> = summary.sections.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                OperationKind::CreateCategories,
                OperationKind::UpdateTasks,
                OperationKind::DeleteTasks
            ]
        );
    }

    #[test]
    fn test_item_descriptions() {
        let summary = summarize(&plan(json!({
            "categories": [{ "name": "Работа", "color": "#FF0000" }, { "name": "Дом" }],
            "tasks": [
                { "title": "Отчёт", "priority": "high", "deadline": "2025-09-05T18:00:00Z", "category": "Работа" },
                { "title": "Позвонить" }
            ],
            "update_categories": [{ "name": "Дом", "new_name": "Быт", "color": "#00FF00", "description": "secret" }],
            "update_tasks": [
                { "id": 7, "title": "Отчёт v2", "priority": "low", "is_done": true },
                { "title": "Позвонить", "category": "Дом", "is_done": false },
                { "deadline": "2025-09-06" }
            ],
            "delete_categories": [{ "name": "Старое" }],
            "delete_tasks": [{ "id": 9, "title": "x" }, {}]
        })));

        assert_eq!(
            summary.section(OperationKind::CreateCategories).unwrap().items,
            vec!["Работа (#FF0000)", "Дом"]
        );
        assert_eq!(
            summary.section(OperationKind::CreateTasks).unwrap().items,
            vec!["Отчёт • high • 05.09.2025 18:00 • Работа", "Позвонить"]
        );
        assert_eq!(
            summary.section(OperationKind::UpdateCategories).unwrap().items,
            vec!["Дом → Быт • #00FF00 • описание"]
        );
        assert_eq!(
            summary.section(OperationKind::UpdateTasks).unwrap().items,
            vec![
                "#7 • название → Отчёт v2 • low • выполнить",
                "Позвонить • Дом • вернуть в работу",
                "(без названия) • 06.09.2025",
            ]
        );
        assert_eq!(
            summary.section(OperationKind::DeleteCategories).unwrap().items,
            vec!["Старое"]
        );
        assert_eq!(
            summary.section(OperationKind::DeleteTasks).unwrap().items,
            vec!["#9", "(без названия)"]
        );
    }

    #[test]
    fn test_mistyped_fields_are_left_out() {
        let summary = summarize(&plan(json!({
            "tasks": [
                { "title": "Отчёт", "priority": 3, "deadline": 1725559200 },
                { "title": null, "category": "Работа" }
            ]
        })));

        assert_eq!(
            summary.section(OperationKind::CreateTasks).unwrap().items,
            vec!["Отчёт", "(без названия) • Работа"]
        );
    }

    #[test]
    fn test_description_content_never_shown() {
        let summary = summarize(&plan(json!({
            "update_categories": [{ "name": "Дом", "description": "очень секретно" }]
        })));
        let rendered = summary.render_lines(None).join("\n");
        assert!(rendered.contains("описание"));
        assert!(!rendered.contains("очень секретно"));
    }

    #[test]
    fn test_render_caps_and_expands() {
        let tasks: Vec<_> = (1..=9).map(|i| json!({ "title": format!("Задача {}", i) })).collect();
        let plan = plan(json!({ "tasks": tasks }));
        let mut preview = PlanPreview::new(&plan, DEFAULT_PREVIEW_LIMIT);

        assert!(preview.can_expand());
        let capped = preview.render();
        assert!(capped.starts_with("Создать задачи (9)"));
        assert!(capped.contains("Задача 6"));
        assert!(!capped.contains("Задача 7"));
        assert!(capped.contains("… ещё 3"));

        assert!(preview.toggle_expanded());
        let full = preview.render();
        assert!(full.contains("Задача 9"));
        assert!(!full.contains("… ещё"));
    }

    #[test]
    fn test_raw_toggle_is_independent_of_expand() {
        let plan = plan(json!({ "delete_categories": [{ "name": "Старое" }] }));
        let mut preview = PlanPreview::new(&plan, DEFAULT_PREVIEW_LIMIT);

        assert!(!preview.render().contains("\"delete_categories\""));

        assert!(preview.toggle_raw());
        assert!(!preview.is_expanded());
        assert!(preview.render().contains("\"delete_categories\""));

        preview.toggle_expanded();
        assert!(preview.shows_raw());

        assert!(!preview.toggle_raw());
        assert!(preview.is_expanded());
        assert!(!preview.render().contains("\"delete_categories\""));
    }

    #[test]
    fn test_format_deadline() {
        assert_eq!(format_deadline("2025-09-05T18:00:00Z"), "05.09.2025 18:00");
        assert_eq!(format_deadline("2025-09-05T18:00:00+03:00"), "05.09.2025 18:00");
        assert_eq!(format_deadline("2025-09-05T09:30"), "05.09.2025 09:30");
        assert_eq!(format_deadline("2025-09-05T09:30:15.250"), "05.09.2025 09:30");
        assert_eq!(format_deadline("2025-09-05"), "05.09.2025");
        assert_eq!(format_deadline("05.09.2025 18:00"), "05.09.2025 18:00");
        assert_eq!(format_deadline("05.09.2025"), "05.09.2025");
        assert_eq!(format_deadline(" завтра "), "завтра");
    }
}
