//! Answer prompt composition.

use crate::extract::Segment;

/// Fixed answer returned when retrieval resolves no context.
pub const NO_CONTEXT_ANSWER: &str = "Context not given.";

/// Render the answer prompt for `question` over the retrieved `context` segments.
pub fn build_answer_prompt(question: &str, context: &[Segment]) -> String {
    let mut rendered = String::new();
    for (position, segment) in context.iter().enumerate() {
        if position > 0 {
            rendered.push_str("\n\n---\n\n");
        }
        rendered.push_str(&segment.text);
    }

    format!(
        "Answer the question based only on the following context, which can include text and \
         tables. If no context is given, say that the context was not given.\n\
         \n\
         Context:\n\
         {rendered}\n\
         \n\
         Question: {question}\n"
    )
}
