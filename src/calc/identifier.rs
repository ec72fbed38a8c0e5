//! Variable names to LaTeX: Greek letters and subscripts.
//!
//! `alpha` -> `\alpha`, `V_in` -> `V_{in}`, `Gamma_L` -> `\Gamma_{L}`. The lookup is
//! case-sensitive, so `gamma` and `Gamma` give different symbols. Only the first underscore
//! splits a name; everything after it is the subscript.

/// Greek letters plus a few engineering aliases (`ohm`, `inf`).
/// `lambda` is a reserved word in the calculation language, so the table uses `lambda_`.
/// `pi` and `e` are numeric constants and stay as written.
pub const GREEK_LETTERS: &[(&str, &str)] = &[
    ("alpha", r"\alpha"),
    ("beta", r"\beta"),
    ("gamma", r"\gamma"),
    ("Gamma", r"\Gamma"),
    ("delta", r"\delta"),
    ("Delta", r"\Delta"),
    ("epsilon", r"\epsilon"),
    ("varepsilon", r"\varepsilon"),
    ("zeta", r"\zeta"),
    ("eta", r"\eta"),
    ("theta", r"\theta"),
    ("Theta", r"\Theta"),
    ("vartheta", r"\vartheta"),
    ("iota", r"\iota"),
    ("kappa", r"\kappa"),
    ("lambda_", r"\lambda"),
    ("Lambda", r"\Lambda"),
    ("mu", r"\mu"),
    ("nu", r"\nu"),
    ("xi", r"\xi"),
    ("Xi", r"\Xi"),
    ("Pi", r"\Pi"),
    ("varpi", r"\varpi"),
    ("rho", r"\rho"),
    ("varrho", r"\varrho"),
    ("sigma", r"\sigma"),
    ("Sigma", r"\Sigma"),
    ("varsigma", r"\varsigma"),
    ("tau", r"\tau"),
    ("upsilon", r"\upsilon"),
    ("Upsilon", r"\Upsilon"),
    ("phi", r"\phi"),
    ("Phi", r"\Phi"),
    ("varphi", r"\varphi"),
    ("chi", r"\chi"),
    ("psi", r"\psi"),
    ("Psi", r"\Psi"),
    ("omega", r"\omega"),
    ("Omega", r"\Omega"),
    ("ohm", r"\Omega"),
    ("inf", r"\infty"),
];

/// table lookup, `None` when the word is not a Greek letter
pub fn greek_letter(word: &str) -> Option<&'static str> {
    GREEK_LETTERS
        .iter()
        .find(|(name, _)| *name == word)
        .map(|(_, latex)| *latex)
}

fn greek_or_plain(word: &str) -> &str {
    greek_letter(word).unwrap_or(word)
}

/// LaTeX for a variable name. Depends on the name only, never on its value.
pub fn render_identifier(name: &str) -> String {
    match name.split_once('_') {
        Some((base, subscript)) => format!(
            "{}_{{{}}}",
            greek_or_plain(base),
            greek_or_plain(subscript)
        ),
        None => greek_or_plain(name).to_string(),
    }
}
