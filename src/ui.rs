use crate::attendance::summarize;
use crate::calendar::{build_calendar_at, CalendarDay, MonthGrid};
use crate::errors::ProfileError;
use crate::ingest::Session;
use crate::models::{AttendanceSummary, CaseNote, Profile, Program};
use chrono::NaiveDate;
use std::cmp::Reverse;
use std::fmt::Write as _;
use std::path::Path;
use tokio::fs;
use tracing::error;

const WAITING_NAME: &str = "Waiting for data...";
const WAITING_PANEL: &str =
    r#"<p class="waiting">Waiting for the host application to provide data...</p>"#;
const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// A named slot in the page template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    ContactName,
    ContactImage,
    Status,
    CaseNotes,
    Programs,
    AttendanceSummary,
    AttendanceCalendar,
}

impl Region {
    pub const ALL: [Region; 7] = [
        Region::ContactName,
        Region::ContactImage,
        Region::Status,
        Region::CaseNotes,
        Region::Programs,
        Region::AttendanceSummary,
        Region::AttendanceCalendar,
    ];

    pub fn marker(self) -> &'static str {
        match self {
            Region::ContactName => "{{CONTACT_NAME}}",
            Region::ContactImage => "{{CONTACT_IMAGE}}",
            Region::Status => "{{STATUS}}",
            Region::CaseNotes => "{{CASE_NOTES}}",
            Region::Programs => "{{PROGRAMS}}",
            Region::AttendanceSummary => "{{ATTENDANCE_SUMMARY}}",
            Region::AttendanceCalendar => "{{ATTENDANCE_CALENDAR}}",
        }
    }

    pub fn element_id(self) -> &'static str {
        match self {
            Region::ContactName => "contactName",
            Region::ContactImage => "contactImage",
            Region::Status => "status",
            Region::CaseNotes => "caseNotesList",
            Region::Programs => "programsList",
            Region::AttendanceSummary => "attendanceSummary",
            Region::AttendanceCalendar => "attendanceCalendar",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PageTemplate {
    source: String,
}

impl PageTemplate {
    pub fn builtin() -> Self {
        Self::from_source(INDEX_HTML)
    }

    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn has_region(&self, region: Region) -> bool {
        self.source.contains(region.marker())
    }
}

/// Reads a replacement template, falling back to the built-in page.
pub async fn load_template(path: &Path) -> PageTemplate {
    match fs::read_to_string(path).await {
        Ok(source) => PageTemplate::from_source(source),
        Err(err) => {
            error!(path = %path.display(), "failed to read page template: {err}");
            PageTemplate::builtin()
        }
    }
}

/// Runs synchronously after every page render.
pub trait LayoutPass: Send + Sync {
    fn after_render(&self, page: &mut String);
}

/// Sizes the case-notes column to the left column once the page has laid out.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchColumnHeights;

impl LayoutPass for MatchColumnHeights {
    fn after_render(&self, page: &mut String) {
        match page.rfind("</body>") {
            Some(index) => page.insert_str(index, COLUMN_HEIGHT_SCRIPT),
            None => page.push_str(COLUMN_HEIGHT_SCRIPT),
        }
    }
}

const COLUMN_HEIGHT_SCRIPT: &str = r#"<script>
    (() => {
      const leftColumn = document.querySelector('.left-column');
      const caseNotesSection = document.querySelector('.case-notes-section');
      if (leftColumn && caseNotesSection) {
        caseNotesSection.style.height = `${leftColumn.offsetHeight}px`;
      }
    })();
  </script>
"#;

/// Everything a page render reads.
#[derive(Debug, Clone, Copy)]
pub struct PageView<'a> {
    pub profile: Option<&'a Profile>,
    pub error: Option<&'a str>,
    pub notice: Option<&'a str>,
    pub today: NaiveDate,
}

impl<'a> PageView<'a> {
    pub fn from_session(session: &'a Session, today: NaiveDate) -> Self {
        Self {
            profile: session.profile(),
            error: session.error(),
            notice: session.notice(),
            today,
        }
    }
}

pub fn render_page(template: &PageTemplate, view: &PageView<'_>, layout: &dyn LayoutPass) -> String {
    let mut page = fill_regions(&template.source, |region| render_region(region, view));
    layout.after_render(&mut page);
    page
}

/// Substitutes each region marker in one pass so rendered text is never
/// rescanned. Regions absent from the template are skipped and logged.
fn fill_regions(template: &str, mut render: impl FnMut(Region) -> String) -> String {
    let mut rendered: Vec<(Region, String)> = Vec::with_capacity(Region::ALL.len());
    for region in Region::ALL {
        if template.contains(region.marker()) {
            rendered.push((region, render(region)));
        } else {
            let err = ProfileError::MissingElement(region.element_id());
            error!(%err, "skipping region render");
        }
    }

    let mut out = String::with_capacity(template.len() + 8 * 1024);
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match rendered
            .iter()
            .find(|(region, _)| tail.starts_with(region.marker()))
        {
            Some((region, html)) => {
                out.push_str(html);
                rest = &tail[region.marker().len()..];
            }
            None => {
                out.push_str("{{");
                rest = &tail[2..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn render_region(region: Region, view: &PageView<'_>) -> String {
    let Some(profile) = view.profile else {
        return match region {
            Region::ContactName => match view.error {
                Some(message) => escape(&format!("Error: {message}")),
                None => WAITING_NAME.to_string(),
            },
            Region::ContactImage => render_image(None),
            Region::Status => render_status(view.notice),
            Region::AttendanceCalendar => String::new(),
            Region::CaseNotes | Region::Programs | Region::AttendanceSummary => {
                WAITING_PANEL.to_string()
            }
        };
    };

    match region {
        Region::ContactName => match view.error {
            Some(message) => escape(&format!("Error: {message}")),
            None => escape(&profile.name),
        },
        Region::ContactImage => render_image(profile.image_source().as_deref()),
        Region::Status => render_status(view.notice),
        Region::CaseNotes => render_case_notes(&profile.case_notes),
        Region::Programs => render_programs(&profile.programs),
        Region::AttendanceSummary => render_summary(&summarize(&profile.attendance)),
        Region::AttendanceCalendar => {
            render_calendar(&build_calendar_at(view.today, &profile.attendance))
        }
    }
}

fn render_image(source: Option<&str>) -> String {
    match source {
        Some(source) => format!(
            r#"<div id="contactImage" class="contact-image" style="display: block;"><img id="contactImageElement" src="{}" alt="Contact photo" /></div>"#,
            escape(source)
        ),
        None => r#"<div id="contactImage" class="contact-image" style="display: none;"></div>"#
            .to_string(),
    }
}

fn render_status(notice: Option<&str>) -> String {
    match notice {
        Some(text) => format!(
            r#"<div class="status" id="status" data-type="info">{}</div>"#,
            escape(text).replace('\n', "<br />")
        ),
        None => r#"<div class="status" id="status"></div>"#.to_string(),
    }
}

/// Most recent first; notes whose date cannot be read sink to the end.
pub fn sorted_case_notes(notes: &[CaseNote]) -> Vec<&CaseNote> {
    let mut sorted: Vec<&CaseNote> = notes.iter().collect();
    sorted.sort_by_key(|note| Reverse(parse_note_date(&note.date)));
    sorted
}

fn parse_note_date(raw: &str) -> Option<NaiveDate> {
    crate::calendar::parse_attendance_date(raw)
        .or_else(|| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok())
}

fn render_case_notes(notes: &[CaseNote]) -> String {
    let mut html = String::new();
    for note in sorted_case_notes(notes) {
        let mut meta = String::new();
        if let Some(chef) = &note.chef {
            let _ = write!(meta, "Chef: {} | ", escape(chef));
        }
        if let Some(staff) = &note.staff {
            let _ = write!(meta, "Staff: {} | ", escape(staff));
        }
        let _ = write!(meta, "User: {}", escape(note.user()));

        let _ = write!(
            html,
            r#"
      <div class="case-note-item">
        <div class="case-note-header">
          <span class="case-note-subject">{subject}</span>
          <span class="case-note-date">{date}</span>
        </div>
        <div class="case-note-meta">{meta}</div>
        <div class="case-note-content">{body}</div>
      </div>"#,
            subject = escape(note.subject()),
            date = escape(&note.date),
            body = escape(&note.note),
        );
    }
    html
}

fn render_programs(programs: &[Program]) -> String {
    let mut html = String::new();
    for program in programs {
        let mut tiers = String::new();
        for (index, tier) in program.tiers().into_iter().enumerate() {
            let label = tier.label(&format!("Tier {}", index + 1));
            let _ = write!(
                tiers,
                r#"<span class="tier-status {}">{}</span>"#,
                tier.css_class(),
                escape(&label)
            );
        }
        let _ = write!(
            html,
            r#"
      <div class="program-item">
        <span class="program-name">{}</span>
        <div class="program-tiers">{}</div>
      </div>"#,
            escape(&program.program),
            tiers
        );
    }
    html
}

fn render_summary(summary: &AttendanceSummary) -> String {
    let tiles = [
        ("present", summary.present, "Present"),
        ("late", summary.late, "Late"),
        ("left-early", summary.left_early, "Left Early"),
        ("absent", summary.absent, "Absent"),
        ("ncns", summary.ncns, "NCNS"),
    ];
    let mut html = String::from(r#"<div class="summary-grid">"#);
    for (class, count, label) in tiles {
        let _ = write!(
            html,
            r#"<div class="summary-item {class}"><span class="summary-count">{count}</span><span class="summary-label">{label}</span></div>"#
        );
    }
    html.push_str("</div>");
    html
}

fn render_calendar(months: &[MonthGrid]) -> String {
    let mut html = String::new();
    for month in months {
        let _ = write!(
            html,
            r#"
      <div class="calendar-month">
        <div class="calendar-month-header">{}</div>
        <div class="calendar-grid">
          <div class="calendar-header">"#,
            escape(&month.label)
        );
        for weekday in WEEKDAYS {
            let _ = write!(html, r#"<div class="calendar-day-header">{weekday}</div>"#);
        }
        html.push_str("</div>");
        for day in &month.days {
            html.push_str(&render_calendar_day(day));
        }
        html.push_str("\n        </div>\n      </div>");
    }
    html
}

pub fn render_calendar_day(day: &CalendarDay) -> String {
    let mut classes = vec!["calendar-day".to_string()];
    if !day.in_month {
        classes.push("other-month".to_string());
    }
    if day.is_today {
        classes.push("today".to_string());
    }

    let mut inner = format!(
        r#"<div class="calendar-day-number">{}</div>"#,
        day.day_number
    );
    if let Some(status) = &day.status {
        classes.push(escape(&status.token));
        if status.excused {
            classes.push("excused".to_string());
        }
        let _ = write!(
            inner,
            r#"<div class="calendar-day-status">{}</div>"#,
            status.badge
        );
        if let Some(note) = &status.note {
            let _ = write!(
                inner,
                r#"<div class="attendance-note-tooltip">{}</div>"#,
                escape(note)
            );
        }
    }

    format!(
        r#"<div class="{}" data-date="{}">{}</div>"#,
        classes.join(" "),
        day.date.format("%Y-%m-%d"),
        inner
    )
}

/// HTML-escapes text for element content and quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}


const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Contact Profile</title>
  <style>
    :root {
      --ink: #2b2a28;
      --muted: #6b645d;
      --card: #ffffff;
      --line: rgba(47, 72, 88, 0.12);
      --present: #2d7a4b;
      --late: #c98a12;
      --left-early: #3f6fb5;
      --absent: #c63b2b;
      --ncns: #7b2d8b;
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      background: #f4f1ec;
      color: var(--ink);
      font-family: "Segoe UI", "Trebuchet MS", sans-serif;
      padding: 18px;
    }

    .layout {
      display: grid;
      grid-template-columns: minmax(0, 3fr) minmax(0, 2fr);
      gap: 18px;
      align-items: start;
    }

    .card {
      background: var(--card);
      border-radius: 14px;
      border: 1px solid var(--line);
      padding: 16px;
    }

    .left-column {
      display: grid;
      gap: 18px;
    }

    .contact-header {
      display: flex;
      align-items: center;
      gap: 14px;
    }

    .contact-image img {
      width: 72px;
      height: 72px;
      border-radius: 50%;
      object-fit: cover;
    }

    h1 {
      margin: 0;
      font-size: 1.6rem;
    }

    h2 {
      margin: 0 0 12px;
      font-size: 1.1rem;
    }

    .waiting {
      text-align: center;
      color: var(--muted);
      font-style: italic;
    }

    .status {
      white-space: normal;
      color: var(--muted);
      font-size: 0.9rem;
    }

    .status:empty {
      display: none;
    }

    .program-item {
      display: flex;
      justify-content: space-between;
      align-items: center;
      padding: 8px 0;
      border-bottom: 1px solid var(--line);
    }

    .tier-status {
      display: inline-block;
      margin-left: 6px;
      padding: 3px 10px;
      border-radius: 999px;
      font-size: 0.8rem;
      background: #eee;
      color: var(--muted);
    }

    .tier-status.tier-complete {
      background: #dff1e5;
      color: var(--present);
    }

    .tier-status.tier-na {
      background: #ececec;
      color: #999;
      text-decoration: line-through;
    }

    .summary-grid {
      display: grid;
      grid-template-columns: repeat(5, 1fr);
      gap: 8px;
      margin-bottom: 14px;
    }

    .summary-item {
      text-align: center;
      border-radius: 10px;
      padding: 8px 4px;
      background: #f8f6f2;
    }

    .summary-count {
      display: block;
      font-size: 1.4rem;
      font-weight: 600;
    }

    .summary-label {
      font-size: 0.75rem;
      color: var(--muted);
    }

    .summary-item.present .summary-count { color: var(--present); }
    .summary-item.late .summary-count { color: var(--late); }
    .summary-item.left-early .summary-count { color: var(--left-early); }
    .summary-item.absent .summary-count { color: var(--absent); }
    .summary-item.ncns .summary-count { color: var(--ncns); }

    .calendar-month {
      margin-bottom: 16px;
    }

    .calendar-month-header {
      font-weight: 600;
      margin-bottom: 6px;
    }

    .calendar-grid {
      display: grid;
      grid-template-columns: repeat(7, 1fr);
      gap: 3px;
    }

    .calendar-header {
      display: contents;
    }

    .calendar-day-header {
      text-align: center;
      font-size: 0.75rem;
      color: var(--muted);
    }

    .calendar-day {
      position: relative;
      min-height: 44px;
      border-radius: 6px;
      background: #faf9f7;
      padding: 4px;
      font-size: 0.8rem;
    }

    .calendar-day.other-month {
      opacity: 0.4;
    }

    .calendar-day.today {
      outline: 2px solid var(--ink);
    }

    .calendar-day-status {
      font-weight: 700;
      text-align: center;
    }

    .calendar-day.present { background: #dff1e5; color: var(--present); }
    .calendar-day.late { background: #fbefd5; color: var(--late); }
    .calendar-day.left-early { background: #e1eaf7; color: var(--left-early); }
    .calendar-day.absent { background: #f8e0dd; color: var(--absent); }
    .calendar-day.ncns { background: #efe0f2; color: var(--ncns); }

    .calendar-day.excused::after {
      content: "E";
      position: absolute;
      top: 2px;
      right: 4px;
      font-size: 0.65rem;
    }

    .attendance-note-tooltip {
      display: none;
      position: absolute;
      z-index: 2;
      left: 0;
      top: 100%;
      min-width: 160px;
      padding: 6px 8px;
      border-radius: 6px;
      background: var(--ink);
      color: white;
      font-size: 0.75rem;
    }

    .calendar-day:hover .attendance-note-tooltip {
      display: block;
    }

    .case-notes-section {
      display: flex;
      flex-direction: column;
      overflow: hidden;
    }

    .case-notes-header {
      display: flex;
      justify-content: space-between;
      align-items: center;
    }

    #caseNotesList {
      overflow-y: auto;
    }

    .case-note-item {
      padding: 10px 0;
      border-bottom: 1px solid var(--line);
    }

    .case-note-header {
      display: flex;
      justify-content: space-between;
      font-weight: 600;
    }

    .case-note-meta {
      font-size: 0.8rem;
      color: var(--muted);
      margin: 4px 0;
    }

    button {
      appearance: none;
      border: none;
      border-radius: 999px;
      padding: 8px 14px;
      font-weight: 600;
      cursor: pointer;
      background: #2f4858;
      color: white;
    }
  </style>
</head>
<body>
  <main class="layout">
    <div class="left-column">
      <section class="card contact-header">
        {{CONTACT_IMAGE}}
        <h1 id="contactName">{{CONTACT_NAME}}</h1>
      </section>
      {{STATUS}}
      <section class="card">
        <h2>Programs</h2>
        <div id="programsList">{{PROGRAMS}}</div>
      </section>
      <section class="card">
        <h2>Attendance</h2>
        <div id="attendanceSummary">{{ATTENDANCE_SUMMARY}}</div>
        <div id="attendanceCalendar">{{ATTENDANCE_CALENDAR}}</div>
      </section>
    </div>
    <section class="card case-notes-section">
      <div class="case-notes-header">
        <h2>Case Notes</h2>
        <form method="post" action="/case-notes/new">
          <button id="addCaseNoteBtn" type="submit">Add Case Note</button>
        </form>
      </div>
      <div id="caseNotesList">{{CASE_NOTES}}</div>
    </section>
  </main>
</body>
</html>
"#;
