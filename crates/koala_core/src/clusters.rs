//! crates/koala_core/src/clusters.rs
//!
//! Lexical-chunk suggestions: for a list of target words, ask the model for
//! natural collocations and phrases, then run a second editing pass that
//! returns them as structured flash cards.

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::domain::{ChatMessage, LangCode, TextGenerationRequest};
use crate::llm::generate_structured;
use crate::ports::{PortResult, TextGenerationClient};

/// Words beyond this many are ignored.
pub const MAX_WORDS: usize = 120;
/// Words sent to the model per request.
pub const BATCH_SIZE: usize = 10;

/// A suggested card: a phrase in the target language and its English meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub term: String,
    pub definition: String,
}

#[derive(Deserialize)]
struct ClusterReply {
    clusters: Vec<Cluster>,
}

const SYSTEM_PROMPT: &str = r#"
You are a language expert specializing in {LANGUAGE} second language acquisition and lexical chunks.
Your task is to generate natural, idiomatic "chunks" (collocations, common phrases,
or sentence stems) from a provided list of target words in {LANGUAGE}.

Instructions:

    Input: A list of target words in {LANGUAGE}.

    Task: For each target word, identify and output two clusters that:
        Includes the target words.
        Are widely recognized as natural and idiomatic in everyday {LANGUAGE}.
        May be a collocation, idiomatic expression, sentence stem, or common phrase.

    Output Format:
    For each target word, return one JSON object with the following structure:

    {"term": "<cluster in {LANGUAGE}>", "definition": "<English translation>"}

    Do not include any extra hints, commentary, or formatting beyond this structure.

    Quality Guidelines:
        Ensure the cluster is grammatically correct and idiomatic.
        Provide an accurate, natural English translation.
        Double-check for grammatical errors, non-idiomatic expressions, or mistranslations.

Examples of High Quality Chunks:

    진하다 ⇒ {"term": "진한 맛", "definition": "Strong flavor"}
    결정 ⇒ {"term": "결정을 내려요", "definition": "Make a decision."}
    기반 ⇒ {"term": "기반 기술을 구현했습니다", "definition": "I implemented the underlying technology."}
    멀리 ⇒ {"term": "멀리서 들려오는 소리", "definition": "A sound heard from afar."}
    굴다 ⇒ {"term": "못되게 굴다", "definition": "To behave badly."}
    생방송 ⇒ {"term": "생방송 시작합니다", "definition": "Live broadcast is starting."}
    여우 ⇒ {"term": "여우 같은 눈빛", "definition": "Fox-like gaze."}
    욕 ⇒ {"term": "욕하지 마세요", "definition": "Please don't curse."}
    공연 ⇒ {"term": "인상적인 공연", "definition": "An impressive performance."}

Avoid examples with poor grammar, non-idiomatic usage, or incorrect translations.
Skip obscure or misspelled.
"#;

const USER_PROMPT: &str = "
Please generate clusters for the following target words:

{WORDS}

Double check your output when you are done.
";

const KOREAN_EDIT: &str = "
You are a Korean language content editor.
You edit flashcards for a language learning app.
Edit the cards so that they conform to the following standards:

1. Convert '다' verbs to the '요' form instead. Example: '가다' ⇒ '가요'. Do this for all verbs and double check your work.
2. Avoid over use of pronouns in translations. Translate \"음식을 데워요\" to just \"heat up food\" rather than \"he/she/they heat up food\".
3. Remove strange, obscure or non-idiomatic examples.
4. Avoid overused words like: 분위기, 상황, 느낌, 느끼다, 계획

Double check your work against these rules when you are done.
";

const GENERIC_EDIT: &str = "Double check your output when you are done.";

fn cluster_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "clusters": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "term": { "type": "string" },
                        "definition": { "type": "string" }
                    },
                    "required": ["term", "definition"]
                }
            }
        },
        "required": ["clusters"]
    })
}

/// Trims each word and drops blank entries.
fn clean_words(words: &[String]) -> String {
    words
        .iter()
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Suggests clusters for up to [`MAX_WORDS`] words, sorted by term with
/// duplicate terms removed. Batches are requested concurrently.
pub async fn generate_clusters(
    client: &dyn TextGenerationClient,
    words: &[String],
    lang: LangCode,
) -> PortResult<Vec<Cluster>> {
    if words.is_empty() {
        return Ok(Vec::new());
    }

    let words = &words[..words.len().min(MAX_WORDS)];
    let batches = words
        .chunks(BATCH_SIZE)
        .map(|batch| clusters_for_batch(client, batch, lang));
    let mut clusters: Vec<Cluster> = try_join_all(batches)
        .await?
        .into_iter()
        .flatten()
        .collect();

    clusters.sort_by(|a, b| a.term.cmp(&b.term));
    clusters.dedup_by(|a, b| a.term == b.term);
    debug!(%lang, count = clusters.len(), "Generated clusters");
    Ok(clusters)
}

async fn clusters_for_batch(
    client: &dyn TextGenerationClient,
    batch: &[String],
    lang: LangCode,
) -> PortResult<Vec<Cluster>> {
    let mut messages = vec![
        ChatMessage::system(SYSTEM_PROMPT.replace("{LANGUAGE}", lang.name())),
        ChatMessage::user(USER_PROMPT.replace("{WORDS}", &clean_words(batch))),
    ];
    let draft = client
        .generate(&TextGenerationRequest::new(messages.clone()))
        .await?;

    // The edit instruction is a user turn so the conversation ends on the user side.
    let edit = if lang == LangCode::Ko {
        KOREAN_EDIT
    } else {
        GENERIC_EDIT
    };
    messages.push(ChatMessage::assistant(draft.text));
    messages.push(ChatMessage::user(edit));

    let request = TextGenerationRequest::new(messages).with_temperature(0.1);
    let reply: ClusterReply = generate_structured(client, request, cluster_schema()).await?;
    Ok(reply.clusters)
}
