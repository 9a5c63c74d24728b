use crate::models::{DiseaseCandidate, NoMatchReason, ResolutionOutcome};

pub const TRIAGE_SYSTEM_PROMPT: &str = r#"Bạn là một trợ lý y tế thông minh, trả lời câu hỏi y tế bằng tiếng Việt một cách chính xác và rõ ràng. Dựa trên ngữ cảnh và câu hỏi, thực hiện như sau:

1. Nếu yêu cầu thông tin về bệnh, cung cấp chi tiết về bệnh đó.
2. Nếu là chuẩn đoán, phân tích và đưa ra bệnh khả năng cao hoặc gợi ý nếu không chắc chắn.
3. Nếu không đủ thông tin để xác định bệnh, hãy hỏi thêm triệu chứng hoặc gợi ý các nhóm bệnh liên quan.
4. Luôn phân biệt 'đau đầu', 'sốt', 'ho', 'khó thở', 'mệt' hoặc các từ khóa tương tự là triệu chứng khi đi kèm mô tả, không phải tên bệnh.
5. Nếu có triệu chứng mới, hãy cập nhật danh sách triệu chứng.
6. Nếu trong trường hợp không đưa ra được tên bệnh cụ thể (chỉ đưa ra được các nhóm bệnh liên quan), hãy yêu cầu thêm thông tin hoặc triệu chứng cụ thể hơn.
7. Luôn khuyến khích người dùng đến bác sĩ nếu triệu chứng nghiêm trọng."#;

/// Asked when the user refers to a disease that was never named.
pub const CONFIRMATION_MESSAGE: &str =
    "Bạn đang đề cập đến bệnh nào? Vui lòng cung cấp tên bệnh để tôi hỗ trợ tốt hơn.";

/// Shown instead of an answer when a turn fails.
pub const FAILURE_MESSAGE: &str =
    "Đã xảy ra lỗi khi xử lý câu hỏi của bạn. Vui lòng thử lại sau.";

/// Build the generation prompt from retrieved context and the raw question.
pub fn build_triage_prompt(context: &str, question: &str, previous_symptoms: &str) -> String {
    format!(
        "**Ngữ cảnh:** {context}\n\
         **Câu hỏi:** {question}\n\
         **Triệu chứng trước đó (nếu có):** {previous_symptoms}\n\n\
         **Phản hồi:**"
    )
}

/// Guidance text for turns that produced no disease.
pub fn no_match_message(reason: NoMatchReason) -> &'static str {
    match reason {
        NoMatchReason::NoCandidates => {
            "Tôi không tìm thấy thông tin phù hợp. Vui lòng mô tả rõ hơn hoặc nêu tên bệnh."
        }
        NoMatchReason::NoDiseaseTagged => {
            "Tôi chưa xác định được bệnh cụ thể. Vui lòng cung cấp thêm thông tin."
        }
    }
}

/// Fixed reply for an outcome, used whenever no generated answer is available.
pub fn outcome_message(outcome: &ResolutionOutcome) -> String {
    match outcome {
        ResolutionOutcome::ConfirmationRequested => CONFIRMATION_MESSAGE.to_string(),
        ResolutionOutcome::NoMatch { reason } => no_match_message(*reason).to_string(),
        ResolutionOutcome::Ambiguous { candidates } => ambiguous_message(candidates),
        ResolutionOutcome::Confirmed { disease, documents, .. } if documents.is_empty() => {
            format!("Tôi chưa tìm thấy thông tin chi tiết về {disease}.")
        }
        ResolutionOutcome::Confirmed { disease, .. } => {
            format!("Đây là thông tin chi tiết về {disease}:")
        }
    }
}

/// Clarifying question listing the shortlisted diseases.
pub fn ambiguous_message(candidates: &[DiseaseCandidate]) -> String {
    format!(
        "Tôi chưa chắc chắn. Bạn có thể đang mắc một trong các bệnh: {}. \
         Vui lòng chọn bệnh hoặc cung cấp thêm thông tin.",
        join_names(candidates.iter().map(|c| c.name.as_str()))
    )
}

/// Generation context used when a shortlist has no passages of its own.
pub fn candidate_context(names: &[String]) -> String {
    format!(
        "Các bệnh có thể liên quan: {}",
        join_names(names.iter().map(String::as_str))
    )
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}
