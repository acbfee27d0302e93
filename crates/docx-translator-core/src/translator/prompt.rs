use crate::codec::{Payload, PayloadFormat, SPLIT_MARKER};
use crate::config::Lang;

/// System and user messages for one completion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn build(payload: &Payload, target: &Lang) -> Self {
        let lang = target.as_str();
        let mut system = format!(
            "You are a professional translator. Translate the text to {lang} without adding any additional information or explanations."
        );
        match payload.format {
            PayloadFormat::Plain => {}
            PayloadFormat::Split { segments } => {
                system.push_str(&format!(
                    " The text consists of {segments} segments separated by lines containing only {SPLIT_MARKER}. \
                     Translate every segment separately and keep each separator line unchanged on its own line."
                ));
            }
            PayloadFormat::Tagged { fragments } => {
                system.push_str(&format!(
                    " The text consists of {fragments} fragments, each starting with a token such as [[T0R0C0]]. \
                     Start the translation of every fragment with its unchanged token."
                ));
            }
        }

        Self {
            system,
            user: user_instruction(lang, &payload.text),
        }
    }
}

/// User message wrapping `text`, phrased in or for the target language.
fn user_instruction(lang: &str, text: &str) -> String {
    match lang {
        "English" => format!(
            "Please translate the following text to English, maintaining professionalism and accuracy:\n\n{text}"
        ),
        "Japanese" => format!(
            "以下のテキストを日本語に翻訳してください。専門性と正確性を保ちながら翻訳してください：\n\n{text}"
        ),
        _ => format!("请将以下文本翻译成{lang}，保持专业性和准确性：\n\n{text}"),
    }
}
