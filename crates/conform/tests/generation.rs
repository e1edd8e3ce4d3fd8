use anyhow::Result;
use conform::providers::configs::{OpenAiProviderConfig, ProviderConfig};
use conform::providers::factory::get_provider;
use conform::{
    Agent, AgentError, CancellationToken, FunctionTool, GenerationConfig, ReactStrategy, Role,
    Schema, SchemaType, Strategy,
};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    }))
}

/// Serve the given replies in order, one per request
async fn scripted_server(replies: &[&str]) -> MockServer {
    let server = MockServer::start().await;
    for reply in replies {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(completion(reply))
            .up_to_n_times(1)
            .mount(&server)
            .await;
    }
    server
}

fn agent_for(server: &MockServer) -> Result<conform::AgentBuilder> {
    let backend = get_provider(ProviderConfig::OpenAi(OpenAiProviderConfig {
        host: server.uri(),
        api_key: "test".to_string(),
        model: "gpt-4o".to_string(),
        temperature: None,
        max_tokens: None,
    }))?;
    Ok(Agent::builder(Box::new(backend)))
}

fn invoice() -> Schema {
    Schema::new(
        "Invoice",
        SchemaType::object()
            .field("number", SchemaType::string().pattern("^INV-[0-9]+$"))
            .field(
                "lines",
                SchemaType::array(
                    SchemaType::object()
                        .field("item", SchemaType::string())
                        .field("quantity", SchemaType::integer().min(1.0)),
                )
                .min_items(1),
            )
            .field("currency", SchemaType::enumeration(["EUR", "USD"]))
            .field("note", SchemaType::string().optional()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_structured_generation_over_http() -> Result<()> {
    let server = scripted_server(&[
        r#"Here it is: {"number": "INV-7", "lines": [], "currency": "GBP"}"#,
        r#"```json
{"currency": "EUR", "number": "INV-7", "lines": [{"item": "bolt", "quantity": 3}], "extra": true}
```"#,
    ])
    .await;

    let mut agent = agent_for(&server)?
        .with_output_schema(invoice())
        .build()?;
    let generation = agent.generate("Extract the invoice.").await?;

    assert!(generation.validated);
    assert_eq!(generation.backend_calls, 2);
    // Canonical form: schema field order, unknown keys dropped
    assert_eq!(
        generation.content,
        r#"{"number":"INV-7","lines":[{"item":"bolt","quantity":3}],"currency":"EUR"}"#
    );

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let body: Value = serde_json::from_slice(&requests[1].body)?;
    let feedback = body["messages"].as_array().unwrap().last().unwrap()["content"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(feedback.contains("- `lines` must contain at least 1 items, got 0 (min_items)"));
    assert!(feedback.contains("- `currency` must be one of \"EUR\", \"USD\", got \"GBP\" (enum_mismatch)"));
    Ok(())
}

#[tokio::test]
async fn test_strict_failure_reports_attempts() -> Result<()> {
    let server = scripted_server(&["no idea", "still no idea", "sorry"]).await;

    let mut agent = agent_for(&server)?
        .with_output_schema(invoice())
        .with_config(GenerationConfig::default())
        .build()?;
    let err = agent.generate("Extract the invoice.").await.unwrap_err();

    assert!(matches!(err, AgentError::MaxRetriesExceeded { attempts: 3, .. }));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    // user, assistant, feedback, assistant, feedback, assistant after the system turn
    assert_eq!(agent.history().len(), 7);
    Ok(())
}

#[tokio::test]
async fn test_react_with_tool_over_http() -> Result<()> {
    let server = scripted_server(&[
        "Thought: I need the invoice file.\nAction: toolCall: read_invoice({\"path\": \"inv-7.txt\"})",
        "Thought: I have the data.\nFinal Answer: {\"number\": \"INV-7\", \"lines\": [{\"item\": \"bolt\", \"quantity\": 3}], \"currency\": \"EUR\"}",
    ])
    .await;

    let reads = Arc::new(AtomicUsize::new(0));
    let counter = reads.clone();
    let read_invoice = FunctionTool::new(
        "read_invoice",
        "Read an invoice file",
        SchemaType::object().field("path", SchemaType::string()),
        move |args: Map<String, Value>| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(format!("{}: INV-7, 3 x bolt, EUR", args["path"].as_str().unwrap_or_default()))
            }
        },
    );

    let mut agent = agent_for(&server)?.with_tool(read_invoice).build()?;
    let generation = ReactStrategy::new()
        .execute(
            &mut agent,
            "Extract inv-7.txt",
            Some(&invoice()),
            &CancellationToken::new(),
        )
        .await?;

    assert!(generation.validated);
    assert_eq!(generation.value.unwrap()["number"], json!("INV-7"));
    assert_eq!(reads.load(Ordering::SeqCst), 1);

    let observation = agent
        .history()
        .iter()
        .find(|turn| turn.role == Role::Tool)
        .unwrap();
    assert_eq!(observation.content, "Observation: inv-7.txt: INV-7, 3 x bolt, EUR");
    Ok(())
}
