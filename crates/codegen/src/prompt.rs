//! Prompt assembly for scene generation.
//!
//! The prompt carries the scene description, the target duration, and the
//! descriptions of the neighboring scenes so the model can write visual
//! transitions that fit the surrounding timeline.

use scenesmith_core::job::GenerationRequest;

const SYSTEM_PROMPT: &str = "\
You write scene components in the scene dialect. Rules:
- Import only from \"@scenesmith/runtime\".
- Declare exactly one `export default component Name { ... }` block.
- Use only these elements: Stage, Box, Text, Sequence, Image, Video, Audio, Font, Icon.
- Animate with interpolate(Runtime.frame, ...) and ease(...).
- Declare the intended duration with a `// @duration: <n>s` comment.
Answer with a single fenced code block and nothing else.";

/// The system prompt sent with every generation request.
pub fn system_prompt() -> &'static str {
    SYSTEM_PROMPT
}

/// Build the user prompt for one scene.
pub fn user_prompt(request: &GenerationRequest) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "Write scene {} of the video: {}\n",
        request.ordinal + 1,
        request.description
    ));
    prompt.push_str(&format!(
        "Target duration: {:.1} seconds at {} fps.\n",
        request.target_duration_secs, request.fps
    ));

    if let Some(prev) = &request.previous_description {
        prompt.push_str(&format!("The previous scene shows: {prev}\n"));
    } else {
        prompt.push_str("This is the opening scene.\n");
    }
    if let Some(next) = &request.next_description {
        prompt.push_str(&format!("The next scene shows: {next}\n"));
    } else {
        prompt.push_str("This is the final scene.\n");
    }

    prompt
}
