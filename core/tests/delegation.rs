//! End-to-end delegation against a real Python interpreter

mod common;

use common::{python_available, repl, CountingFactory, ScriptedLlm};
use rlm_core::agent::{Agent, AgentConfig, AgentCore, SubAgent, SubAgentConfig};
use rlm_core::llm::{ContentBlock, LlmMessage};
use rlm_core::repl::{DataStore, PythonEvaluatorFactory};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn python_factory() -> PythonEvaluatorFactory {
    PythonEvaluatorFactory::new("python3", Duration::from_secs(30))
}

fn sub_agent(llm: Arc<ScriptedLlm>, config: SubAgentConfig) -> SubAgent {
    SubAgent::new(llm, config, Arc::new(python_factory()))
}

#[tokio::test]
async fn final_on_first_fragment() {
    if !python_available() {
        return;
    }
    let llm = ScriptedLlm::texts(&[&repl("FINAL(5)")]);
    let factory = CountingFactory::new(python_factory());

    let result = SubAgent::new(llm.clone(), SubAgentConfig::default(), factory.clone())
        .run("give five", 0)
        .await;

    assert_eq!(result, json!(5));
    assert_eq!(llm.calls(), 1);
    assert_eq!(factory.evaluations(), 1);
}

#[tokio::test]
async fn final_var_after_assignment() {
    if !python_available() {
        return;
    }
    let llm = ScriptedLlm::texts(&[&repl("x = 2 + 3"), &repl("FINAL_VAR(\"x\")")]);
    let factory = CountingFactory::new(python_factory());

    let result = SubAgent::new(llm.clone(), SubAgentConfig::default(), factory.clone())
        .run("compute", 0)
        .await;

    assert_eq!(result, json!(5));
    assert_eq!(llm.calls(), 2);
    assert_eq!(factory.evaluations(), 2);
    let second = &llm.requests()[1];
    assert_eq!(
        second.last().unwrap().get_text().unwrap(),
        "REPL Output:\n(no output)"
    );
}

#[tokio::test]
async fn raising_fragment_reports_and_keeps_bindings() {
    if !python_available() {
        return;
    }
    let llm = ScriptedLlm::texts(&[
        &repl("y = 7\nprint('before')\n1 / 0"),
        &repl("FINAL(y * 2)"),
    ]);

    let result = sub_agent(llm.clone(), SubAgentConfig::default())
        .run("risky", 0)
        .await;

    assert_eq!(result, json!(14));
    let feedback = llm.requests()[1].last().unwrap().get_text().unwrap();
    assert!(feedback.starts_with("REPL Output:\nbefore\n"));
    assert!(feedback.contains("Error: ZeroDivisionError: division by zero (line 3)"));
}

#[tokio::test]
async fn data_store_is_visible_through_environ() {
    if !python_available() {
        return;
    }
    let llm = ScriptedLlm::texts(&[&repl(
        "import os, re\nm = re.search(r'magic number is (\\d+)', os.environ['HAYSTACK_DATA'])\nFINAL(m.group(1))",
    )]);
    let data = DataStore::new().with_entry(
        "HAYSTACK_DATA",
        "blah text\nThe magic number is 1234567\nrandom data",
    );

    let result = sub_agent(llm, SubAgentConfig::default())
        .with_data(data)
        .run("find it", 0)
        .await;

    assert_eq!(result, json!("1234567"));
    assert!(std::env::var("HAYSTACK_DATA").is_err());
}

#[tokio::test]
async fn llm_query_runs_a_nested_sub_agent() {
    if !python_available() {
        return;
    }
    // parent fragment, nested delegation's only turn, then nothing else
    let llm = ScriptedLlm::texts(&[
        &repl("answer = llm_query('What is 6 * 7?', 'arithmetic')\nFINAL(answer)"),
        &repl("FINAL(6 * 7)"),
    ]);

    let result = sub_agent(llm.clone(), SubAgentConfig::default())
        .run("outer", 0)
        .await;

    assert_eq!(result, json!(42));
    let nested_task = llm.requests()[1][1].get_text().unwrap();
    assert_eq!(nested_task, "What is 6 * 7?\n\nContext:\narithmetic");
}

#[tokio::test]
async fn outer_agent_delegates_through_call_sub_rlm() {
    if !python_available() {
        return;
    }
    let llm = ScriptedLlm::new(vec![
        LlmMessage::assistant_blocks(vec![ContentBlock::ToolUse {
            id: "call-1".to_string(),
            name: "call_sub_rlm".to_string(),
            input: json!({"task": "Return the answer"}),
        }]),
        LlmMessage::assistant(repl("FINAL('forty-two')")),
        LlmMessage::assistant("The answer is forty-two."),
    ]);
    let sub = sub_agent(llm.clone(), SubAgentConfig::default());
    let mut agent = AgentCore::new(
        AgentConfig::default(),
        llm.clone(),
        Arc::new(sub),
        PathBuf::from("."),
        "python3".to_string(),
    );

    let execution = agent.execute_task("What is the answer?").await.unwrap();

    assert!(execution.success);
    assert_eq!(execution.final_result, "The answer is forty-two.");
    assert_eq!(llm.calls(), 3);
}
