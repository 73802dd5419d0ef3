//! Chat-completions responder that speaks as the stream's host persona.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{ensure_success, join_url, ResponseGenerator, ServiceError, ServiceResult};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4";

/// Topics idle-time questions are drawn from.
pub const DEFAULT_TOPICS: &[&str] = &[
    "Brasil", "TV", "violência", "política", "educação", "saúde", "emprego",
    "justiça social", "humor", "democracia", "chimarrão", "churrasco", "Oktoberfest",
    "Cataratas do Iguaçu", "povo trabalhador", "povo acolhedor", "sotaque", "frio", "praia",
    "alegria", "esperança", "amor", "paz", "união", "investimento", "políticas públicas",
    "informação", "debates", "entretenimento", "risadas", "descontração", "oportunidades",
    "cultura", "arte", "geografia", "história", "ciência", "tecnologia", "música",
    "literatura", "filosofia", "religião", "esporte", "economia",
];

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// System prompts and few-shot exchanges for both generation modes.
#[derive(Debug, Clone)]
pub struct Persona {
    pub answer_system: String,
    pub answer_examples: Vec<(String, String)>,
    pub question_system: String,
    pub question_examples: Vec<(String, String)>,
    pub topics: Vec<String>,
}

impl Default for Persona {
    fn default() -> Self {
        let pairs = |items: &[(&str, &str)]| {
            items
                .iter()
                .map(|(q, a)| (q.to_string(), a.to_string()))
                .collect::<Vec<_>>()
        };

        Self {
            answer_system: "You are impersonating Luiz Inácio Lula da Silva, use his speech style and write in Portuguese (BR), the answer will be used to create an audio (TTS), so write only the answer. Be funny, and charismatic, and don't take anything too seriously, your goal is to entertain and inform. Refer to the user that made the question and repeat the question at the beginning. Be brief, the text cannot be longer than 1 and a half minutes to read.".to_string(),
            answer_examples: pairs(&[
                (
                    "Lula, qual a solução para os problemas do Brasil? - Canturil",
                    "Meu amigo Canturil pergunta: \"qual a solução para os problemas do Brasil?\". Ah, meu amigo, resolver os problemas do Brasil não é como fazer miojo, que tá pronto em três minutos, mas vou te dar a receita resumida: educação de qualidade, saúde para todos e emprego, muito emprego! E claro, um pouquinho de justiça social, pra temperar. Um abraço, companheiro!",
                ),
                (
                    "Lula, qual o seu programa de TV preferido? - EdoomOmega",
                    "O companheiro EdoomOmega pergunta: \"qual o seu programa de TV preferido?\". Ah, meu amigo, eu sou um homem ocupado e não costumo ter muito tempo para assistir TV, mas confesso que tenho uma queda por programas de humor, afinal, rir é um remédio para a alma. Um abraço e um sorriso, companheiro!",
                ),
            ]),
            question_system: "You need to generate a brief question to Luiz Inácio Lula da Silva. Pick different topics, culture, politics, art, geography and more. Do not make questions that require a big answer. Be creative and funny, your goal is to entertain and inform. Always start with Lula, and end with a question mark.".to_string(),
            question_examples: pairs(&[
                (
                    "Gere uma pergunta para o Lula tema Brasil",
                    "Lula, qual a solução para os problemas do Brasil?",
                ),
                (
                    "Gere outra pergunta para o Lula tema TV",
                    "Lula, qual o seu programa de TV preferido?",
                ),
            ]),
            topics: DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// [`ResponseGenerator`] backed by an OpenAI-compatible chat completions API.
pub struct OpenAiResponder {
    client: Client,
    config: OpenAiConfig,
    persona: Persona,
}

impl OpenAiResponder {
    pub fn new(client: Client, config: OpenAiConfig) -> Self {
        Self {
            client,
            config,
            persona: Persona::default(),
        }
    }

    pub fn with_persona(mut self, persona: Persona) -> Self {
        self.persona = persona;
        self
    }

    fn pick_topic(&self) -> &str {
        self.persona
            .topics
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or("Brasil")
    }

    async fn complete(
        &self,
        system: &str,
        examples: &[(String, String)],
        user: &str,
    ) -> ServiceResult<String> {
        let mut messages = Vec::with_capacity(examples.len() * 2 + 2);
        messages.push(ChatMessage {
            role: "system",
            content: system,
        });
        for (question, answer) in examples {
            messages.push(ChatMessage {
                role: "user",
                content: question,
            });
            messages.push(ChatMessage {
                role: "assistant",
                content: answer,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: user,
        });

        let request = ChatRequest {
            model: &self.config.model,
            messages,
        };

        let response = self
            .client
            .post(join_url(&self.config.base_url, "chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;
        let body: ChatResponse = ensure_success("openai", response).await?.json().await?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(ServiceError::EmptyResponse("openai"))
    }
}

#[async_trait]
impl ResponseGenerator for OpenAiResponder {
    #[instrument(name = "generate_response", skip(self))]
    async fn generate_response(&self, prompt: &str) -> ServiceResult<String> {
        let answer = self
            .complete(
                &self.persona.answer_system,
                &self.persona.answer_examples,
                prompt,
            )
            .await?;
        debug!("Generated response of {} chars", answer.len());
        Ok(answer)
    }

    #[instrument(name = "generate_question", skip(self))]
    async fn generate_question(&self) -> ServiceResult<String> {
        let request = format!("Gere outra pergunta para o Lula tema {}", self.pick_topic());
        let question = self
            .complete(
                &self.persona.question_system,
                &self.persona.question_examples,
                &request,
            )
            .await?;
        debug!("Generated question: {}", question);
        Ok(question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn responder(server: &MockServer) -> OpenAiResponder {
        let config = OpenAiConfig::new("sk-test").with_base_url(format!("{}/v1", server.uri()));
        OpenAiResponder::new(Client::new(), config)
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        })
    }

    #[tokio::test]
    async fn test_generate_response_returns_first_choice() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({ "model": "gpt-4" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(" oi ")))
            .expect(1)
            .mount(&server)
            .await;

        let answer = responder(&server)
            .generate_response("Lula, hello - ana")
            .await
            .unwrap_or_else(|e| panic!("Expected Ok, got Err: {e}"));

        assert_eq!(answer, "oi");
    }

    #[tokio::test]
    async fn test_prompt_is_last_user_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("oi")))
            .mount(&server)
            .await;

        responder(&server)
            .generate_response("Lula, hello - ana")
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let messages = body["messages"].as_array().unwrap();

        assert_eq!(messages[0]["role"], "system");
        let last = messages.last().unwrap();
        assert_eq!(last["role"], "user");
        assert_eq!(last["content"], "Lula, hello - ana");
    }

    #[tokio::test]
    async fn test_generate_question_uses_configured_topic() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Lula, e o frio?")))
            .mount(&server)
            .await;

        let persona = Persona {
            topics: vec!["frio".to_string()],
            ..Persona::default()
        };
        let question = responder(&server)
            .with_persona(persona)
            .generate_question()
            .await
            .unwrap();
        assert_eq!(question, "Lula, e o frio?");

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let last = body["messages"].as_array().unwrap().last().unwrap().clone();
        assert_eq!(last["content"], "Gere outra pergunta para o Lula tema frio");
    }

    #[tokio::test]
    async fn test_empty_choices_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let result = responder(&server).generate_response("Lula, hi - bo").await;
        assert!(matches!(result, Err(ServiceError::EmptyResponse("openai"))));
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let result = responder(&server).generate_question().await;
        match result {
            Err(ServiceError::Status { status, .. }) => assert_eq!(status, 429),
            other => panic!("Expected Status error, got: {other:?}"),
        }
    }
}
