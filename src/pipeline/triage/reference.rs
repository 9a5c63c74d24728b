/// Back-reference phrasings ("this disease", "the one just mentioned", ...).
const REFERENCE_TEMPLATES: &[&str] = &[
    "Bệnh này",
    "Bệnh vừa {context}",
    "Bệnh vừa đề cập",
    "Thông tin thêm về {disease}",
    "Chi tiết về bệnh này",
    "Nói thêm về bệnh vừa nêu",
    "Bệnh vừa nói đến",
];

const CONTEXT_STAND_IN: &str = "nêu";

/// Lowercased patterns with placeholders replaced by generic stand-ins.
fn reference_patterns() -> impl Iterator<Item = String> {
    REFERENCE_TEMPLATES.iter().map(|template| {
        template
            .replace("{context}", CONTEXT_STAND_IN)
            .replace("{disease}", "")
            .trim()
            .to_lowercase()
    })
}

/// Whether the utterance points back at an already-discussed disease
/// without naming it.
pub fn is_reference(text: &str) -> bool {
    let lower = text.to_lowercase();
    reference_patterns().any(|pattern| lower.contains(&pattern))
}
