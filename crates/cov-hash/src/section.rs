//! Heading-based criteria slicer.
//!
//! Independent of the extraction pipeline. Only line shapes and a fixed
//! heading vocabulary are consulted.

const START_HEADINGS: &[&str] = &[
    "coverage criteria",
    "medical necessity criteria",
    "medically necessary",
    "criteria for coverage",
    "policy statement",
    "coverage policy",
    "coverage indications",
    "indications and limitations",
    "clinical criteria",
];

const STOP_HEADINGS: &[&str] = &[
    "background",
    "rationale",
    "description",
    "references",
    "coding",
    "codes",
    "policy history",
    "revision history",
    "document history",
    "definitions",
    "summary of evidence",
    "scientific evidence",
    "disclaimer",
];

/// Headings are short standalone lines.
const MAX_HEADING_LEN: usize = 80;

/// Cap on sliced text so a missing stop heading cannot swallow a whole manual.
const MAX_SECTION_CHARS: usize = 20_000;

/// Return the text under every criteria heading in `content`, or `None` when
/// no such heading exists.
pub fn slice_criteria_section(content: &str) -> Option<String> {
    let mut out = String::new();
    let mut inside = false;

    for line in content.lines() {
        let trimmed = line.trim();
        if let Some(kind) = heading_kind(trimmed) {
            inside = kind == Heading::Start;
            continue;
        }
        if inside && !trimmed.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(trimmed);
            if out.len() >= MAX_SECTION_CHARS {
                break;
            }
        }
    }

    if out.is_empty() {
        None
    } else {
        Some(truncate_on_char_boundary(out, MAX_SECTION_CHARS))
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Heading {
    Start,
    Stop,
}

fn heading_kind(line: &str) -> Option<Heading> {
    if line.is_empty() || line.len() > MAX_HEADING_LEN {
        return None;
    }
    let norm: String = line
        .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == '#' || c == ' ')
        .trim_end_matches(':')
        .trim()
        .to_ascii_lowercase();
    if norm.is_empty() {
        return None;
    }
    if START_HEADINGS.iter().any(|h| norm.starts_with(h)) {
        Some(Heading::Start)
    } else if STOP_HEADINGS.iter().any(|h| norm.starts_with(h)) {
        Some(Heading::Stop)
    } else {
        None
    }
}

fn truncate_on_char_boundary(mut s: String, max: usize) -> String {
    if s.len() <= max {
        return s;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
    s
}
