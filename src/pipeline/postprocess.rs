//! Post-processing: deterministic cleanup of VLM-generated LaTeX.
//!
//! Two entry points, applied at two different moments:
//!
//! * [`clean_fragment`] runs on each model response. Even when told not to,
//!   models wrap output in ```` ```latex ```` fences or emit a full
//!   `\documentclass … \end{document}` file; both would break the combined
//!   document once fragments are concatenated.
//!
//! * [`format_document`] runs once on the combined body. It strips
//!   packages the target toolchain is unlikely to have, then builds the one
//!   preamble the whole document shares.

use once_cell::sync::Lazy;
use regex::Regex;

/// Packages a fragment may keep `\usepackage` lines for.
pub const ALLOWED_PACKAGES: &[&str] = &[
    "amsmath", "amssymb", "amsthm", "graphicx", "geometry", "inputenc", "fontenc", "babel",
    "xcolor", "listings", "tikz", "pgf", "pgfplots", "array", "tabularx", "booktabs",
];

/// Commands whose lines are dropped because their packages are not loaded.
const FORBIDDEN_COMMANDS: &[&str] = &[r"\fancyhead", r"\hypersetup"];

/// Clean one model response into a body fragment.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip outer code fences
/// 3. Drop document wrapper lines (`\documentclass`, `\begin{document}`, `\end{document}`)
/// 4. Trim surrounding whitespace
pub fn clean_fragment(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = strip_code_fences(&s);
    let s = drop_document_wrapper(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*[ \t]*\n(.*?)\n?```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    let trimmed = input.trim();
    if let Some(caps) = RE_OUTER_FENCES.captures(trimmed) {
        caps[1].to_string()
    } else {
        trimmed.to_string()
    }
}

// ── Rule 3: Drop document wrapper ────────────────────────────────────────────

static RE_WRAPPER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\\documentclass(\[[^\]]*\])?\{[^}]*\}|\\begin\{document\}|\\end\{document\})\s*$")
        .unwrap()
});

fn drop_document_wrapper(input: &str) -> String {
    input
        .lines()
        .filter(|line| !RE_WRAPPER_LINE.is_match(line))
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Document formatting ──────────────────────────────────────────────────────

static RE_USEPACKAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\usepackage(?:\[[^\]]*\])?\{([^}]*)\}").unwrap());

/// Keep a `\usepackage` line only when every package it loads is allowed.
fn package_line_allowed(line: &str) -> bool {
    let Some(caps) = RE_USEPACKAGE.captures(line) else {
        return false;
    };
    caps[1]
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .all(|p| ALLOWED_PACKAGES.contains(&p))
}

/// Remove unsupported packages and commands from the combined body.
pub fn clean_body(content: &str) -> String {
    content
        .lines()
        .filter(|line| {
            if line.contains(r"\usepackage") {
                package_line_allowed(line)
            } else {
                !FORBIDDEN_COMMANDS.iter().any(|cmd| line.contains(cmd))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn uses_tikz(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("tikzpicture") || body.contains(r"\tikz") || lower.contains("nodepart")
}

fn uses_uml_macros(body: &str) -> bool {
    [r"\method", r"\attribute", r"\classname"]
        .iter()
        .any(|m| body.contains(m))
}

const BASE_PREAMBLE: &str = "\\documentclass{article}\n\
\\usepackage{amsmath}\n\
\\usepackage{amssymb}\n\
\\usepackage{graphicx}";

const TIKZ_PREAMBLE: &str = "\\usepackage{tikz}\n\
\\usetikzlibrary{shapes.multipart,arrows,positioning}\n\
\\tikzset{\n\
  class/.style={rectangle split, rectangle split parts=3, draw, text centered, font=\\small},\n\
  abstract/.style={class, font=\\small\\itshape},\n\
  inheritance/.style={-open triangle 60, thick}\n\
}";

const UML_MACROS: &str = "\\newcommand{\\classname}[1]{\\textbf{#1}}\n\
\\newcommand{\\attribute}[1]{\\textit{#1}}\n\
\\newcommand{\\method}[1]{\\textit{#1}}";

/// Wrap a combined body into a complete, compilable LaTeX document.
///
/// The preamble always loads amsmath, amssymb and graphicx. TikZ (with the
/// predefined UML node styles the system prompt promises) is added only
/// when the body draws something, and the UML helper macros only when a
/// model used them anyway.
pub fn format_document(body: &str) -> String {
    let cleaned = clean_body(body);

    let mut doc = String::from(BASE_PREAMBLE);
    let tikz = uses_tikz(&cleaned);
    if tikz {
        doc.push('\n');
        doc.push_str(TIKZ_PREAMBLE);
    }
    if tikz && uses_uml_macros(&cleaned) {
        doc.push('\n');
        doc.push_str(UML_MACROS);
    }

    doc.push_str("\n\\begin{document}\n\n");
    doc.push_str(&cleaned);
    doc.push_str("\n\n\\end{document}\n");
    doc
}
