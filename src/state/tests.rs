use super::*;
use crate::event::{EventKind, InboundEvent, OutboundEvent, StatusReport};
use crate::subscription::{BroadcastHub, Observer};
use serde_json::{json, Value};
use std::sync::Arc;

fn engine() -> StateEngine {
    let agents = AgentRegistry::new([
        ("tom", 5),
        ("itombot", 4),
        ("research", 3),
        ("marketing", 2),
        ("support", 1),
    ]);
    StateEngine::new(agents, ActivityHistory::default(), Arc::new(BroadcastHub::new(1024)))
}

/// Drain every queued frame as JSON
fn drain(observer: &mut Observer) -> Vec<Value> {
    let mut frames = Vec::new();
    while let Some(frame) = observer.try_recv() {
        frames.push(serde_json::from_str(&frame).unwrap());
    }
    frames
}

/// Rebuild client-side state from an init frame followed by event frames,
/// the way a renderer would.
fn replay(frames: &[Value]) -> Value {
    let mut agents = frames[0]["data"]["agents"].clone();
    let mut log: Vec<Value> = frames[0]["data"]["activityLog"]
        .as_array()
        .unwrap()
        .clone();

    for frame in &frames[1..] {
        let agent = frame["agent"].as_str().unwrap();
        let data = &frame["data"];
        match frame["type"].as_str().unwrap() {
            "thinking" => {
                let thought = data["thought"].as_str().filter(|t| !t.is_empty());
                agents[agent]["thought"] = json!(thought);
                agents[agent]["status"] = json!(if thought.is_some() { "working" } else { "idle" });
            }
            "status" => {
                if let Some(status) = data["status"].as_str() {
                    agents[agent]["status"] = json!(status);
                }
                if let Some(task) = data["task"].as_str().filter(|t| !t.is_empty()) {
                    agents[agent]["task"] = json!(task);
                }
            }
            "action" => log.insert(
                0,
                json!({"timestamp": frame["timestamp"], "agent": agent,
                       "text": data["action"], "type": "action"}),
            ),
            "meeting" => log.insert(
                0,
                json!({"timestamp": frame["timestamp"], "agent": agent,
                       "text": format!("Meeting with {}: {}",
                           data["with"].as_str().unwrap(), data["topic"].as_str().unwrap()),
                       "type": "meeting"}),
            ),
            _ => {}
        }
        log.truncate(DEFAULT_MAX_ACTIVITY);
    }

    json!({"agents": agents, "activityLog": log})
}

#[tokio::test]
async fn test_status_sequence_last_status_and_last_nonempty_task() {
    let engine = engine();

    for (status, task) in [
        ("working", Some("launch")),
        ("blocked", None),
        ("working", Some("")),
        ("idle", None),
    ] {
        engine
            .process_event(InboundEvent::status(
                "marketing",
                Some(status.to_string()),
                task.map(str::to_string),
            ))
            .await
            .unwrap();
    }

    let snapshot = engine.snapshot().await;
    let record = &snapshot.agents["marketing"];
    assert_eq!(record.status, AgentStatus::Idle);
    assert_eq!(record.task.as_deref(), Some("launch"));
}

#[tokio::test]
async fn test_thinking_derives_status() {
    let engine = engine();

    engine
        .process_event(InboundEvent::thinking("research", Some("reading papers".to_string())))
        .await
        .unwrap();
    let record = engine.snapshot().await.agents["research"].clone();
    assert_eq!(record.status, AgentStatus::Working);
    assert_eq!(record.thought.as_deref(), Some("reading papers"));

    engine
        .process_event(InboundEvent::thinking("research", Some(String::new())))
        .await
        .unwrap();
    assert_eq!(engine.snapshot().await.agents["research"].status, AgentStatus::Idle);

    engine
        .process_event(InboundEvent::thinking("research", Some("again".to_string())))
        .await
        .unwrap();
    engine
        .process_event(InboundEvent::thinking("research", None))
        .await
        .unwrap();
    let record = engine.snapshot().await.agents["research"].clone();
    assert_eq!(record.status, AgentStatus::Idle);
    assert_eq!(record.thought, None);
}

#[tokio::test]
async fn test_action_and_meeting_append_history_only() {
    let engine = engine();

    engine
        .process_event(InboundEvent::action("support", "answered ticket #12"))
        .await
        .unwrap();
    engine
        .process_event(InboundEvent::meeting("tom", "research", "Q3 roadmap"))
        .await
        .unwrap();

    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.activity_log.len(), 2);
    assert_eq!(snapshot.activity_log[0].kind, ActivityKind::Meeting);
    assert_eq!(snapshot.activity_log[0].text, "Meeting with research: Q3 roadmap");
    assert_eq!(snapshot.activity_log[1].kind, ActivityKind::Action);
    assert_eq!(snapshot.activity_log[1].text, "answered ticket #12");

    // Registry untouched
    assert_eq!(snapshot.agents["support"], AgentRecord::new(1));
    assert_eq!(snapshot.agents["tom"], AgentRecord::new(5));
}

#[tokio::test]
async fn test_history_bounded_at_fifty() {
    let engine = engine();

    for n in 1..=51 {
        engine
            .process_event(InboundEvent::action("support", format!("action {}", n)))
            .await
            .unwrap();
    }

    let log = engine.snapshot().await.activity_log;
    assert_eq!(log.len(), 50);
    assert_eq!(log[0].text, "action 51");
    assert_eq!(log[49].text, "action 2");
    assert!(log.iter().all(|e| e.text != "action 1"));
}

#[tokio::test]
async fn test_unknown_agent_rejected_without_broadcast() {
    let engine = engine();
    let before = engine.snapshot().await;
    let mut observer = engine.join().await.unwrap();

    let result = engine
        .process_event(InboundEvent::status("ghost", Some("idle".to_string()), None))
        .await;

    assert_eq!(result, Err(ProcessError::UnknownAgent("ghost".to_string())));
    assert_eq!(engine.snapshot().await, before);

    let frames = drain(&mut observer);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["type"], "init");
}

#[tokio::test]
async fn test_unknown_type_and_bad_payload_rejected() {
    let engine = engine();
    let mut observer = engine.join().await.unwrap();

    let unknown = InboundEvent {
        event_type: "dance".to_string(),
        agent: "tom".to_string(),
        data: json!({}),
    };
    assert_eq!(
        engine.process_event(unknown).await,
        Err(ProcessError::UnknownEventType("dance".to_string()))
    );

    let bad = InboundEvent::new(EventKind::Action, "tom", json!({"text": "no action field"}));
    assert!(matches!(
        engine.process_event(bad).await,
        Err(ProcessError::InvalidPayload { kind: EventKind::Action, .. })
    ));

    assert!(engine.snapshot().await.activity_log.is_empty());
    assert_eq!(drain(&mut observer).len(), 1);
}

#[tokio::test]
async fn test_outbound_echoes_data_with_timestamp() {
    let engine = engine();
    let mut observer = engine.join().await.unwrap();

    let data = json!({"status": "working", "task": "triage", "extra": [1, 2]});
    let outbound = engine
        .process_event(InboundEvent::new(EventKind::Status, "support", data.clone()))
        .await
        .unwrap();

    assert_eq!(outbound.kind, EventKind::Status);
    assert_eq!(outbound.data, data);
    assert!(outbound.timestamp > 0);

    let frames = drain(&mut observer);
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[1], serde_json::to_value(&outbound).unwrap());
}

#[tokio::test]
async fn test_timestamps_non_decreasing() {
    let engine = engine();
    let mut last = 0;

    for n in 0..100 {
        let event = engine
            .process_event(InboundEvent::action("tom", format!("step {}", n)))
            .await
            .unwrap();
        assert!(event.timestamp >= last);
        last = event.timestamp;
    }

    let log = engine.snapshot().await.activity_log;
    assert!(log.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
}

#[tokio::test]
async fn test_batch_matches_individual_submits() {
    let batched = engine();
    let individual = engine();
    let mut batched_observer = batched.join().await.unwrap();
    let mut individual_observer = individual.join().await.unwrap();

    let report: StatusReport = serde_json::from_value(json!({
        "agent": "support",
        "status": "working",
        "recentActions": ["a", "b"]
    }))
    .unwrap();
    batched
        .process_batch("support", report.into_events())
        .await
        .unwrap();

    individual
        .process_event(InboundEvent::status("support", Some("working".to_string()), None))
        .await
        .unwrap();
    individual
        .process_event(InboundEvent::action("support", "a"))
        .await
        .unwrap();
    individual
        .process_event(InboundEvent::action("support", "b"))
        .await
        .unwrap();

    let strip = |frames: Vec<Value>| -> Vec<Value> {
        frames
            .into_iter()
            .skip(1)
            .map(|mut f| {
                f["timestamp"] = Value::Null;
                f
            })
            .collect()
    };
    let batched_frames = strip(drain(&mut batched_observer));
    let individual_frames = strip(drain(&mut individual_observer));

    assert_eq!(batched_frames.len(), 3);
    assert_eq!(batched_frames, individual_frames);

    let tail: Vec<&str> = batched_frames[1..]
        .iter()
        .map(|f| f["data"]["action"].as_str().unwrap())
        .collect();
    assert_eq!(tail, vec!["a", "b"]);

    let a = batched.snapshot().await;
    let b = individual.snapshot().await;
    assert_eq!(a.agents, b.agents);
    let texts = |s: &Snapshot| s.activity_log.iter().map(|e| e.text.clone()).collect::<Vec<_>>();
    assert_eq!(texts(&a), texts(&b));
}

#[tokio::test]
async fn test_batch_unknown_agent_applies_nothing() {
    let engine = engine();
    let mut observer = engine.join().await.unwrap();

    let result = engine
        .process_batch("ghost", vec![InboundEvent::action("ghost", "a")])
        .await;

    assert_eq!(result, Err(ProcessError::UnknownAgent("ghost".to_string())));
    assert!(engine.snapshot().await.activity_log.is_empty());
    assert_eq!(drain(&mut observer).len(), 1);
}

#[tokio::test]
async fn test_batch_with_invalid_event_applies_nothing() {
    let engine = engine();

    let events = vec![
        InboundEvent::action("tom", "first"),
        InboundEvent::new(EventKind::Meeting, "tom", json!({"with": "support"})),
    ];
    assert!(engine.process_batch("tom", events).await.is_err());
    assert!(engine.snapshot().await.activity_log.is_empty());
}

#[tokio::test]
async fn test_late_joiner_converges_with_early_joiner() {
    let engine = engine();
    let mut early = engine.join().await.unwrap();

    engine
        .process_event(InboundEvent::status("tom", Some("working".to_string()), Some("plan".to_string())))
        .await
        .unwrap();
    engine
        .process_event(InboundEvent::action("tom", "wrote plan"))
        .await
        .unwrap();

    let mut late = engine.join().await.unwrap();

    engine
        .process_event(InboundEvent::thinking("support", Some("ticket #4".to_string())))
        .await
        .unwrap();
    engine
        .process_event(InboundEvent::meeting("support", "tom", "escalation"))
        .await
        .unwrap();

    let early_frames = drain(&mut early);
    let late_frames = drain(&mut late);

    // Late joiner sees the first two events only through its snapshot
    assert_eq!(early_frames.len(), 5);
    assert_eq!(late_frames.len(), 3);

    let expected = serde_json::to_value(engine.snapshot().await).unwrap();
    assert_eq!(replay(&early_frames), expected);
    assert_eq!(replay(&late_frames), expected);
}

#[tokio::test]
async fn test_concurrent_producers_and_joiners_see_coherent_streams() {
    let engine = Arc::new(engine());
    let mut early = engine.join().await.unwrap();

    let mut handles = Vec::new();
    for producer in 0..8 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            for n in 0..20 {
                engine
                    .process_event(InboundEvent::action("research", format!("p{}-{}", producer, n)))
                    .await
                    .unwrap();
            }
        }));
    }

    let mut joiners = Vec::new();
    for _ in 0..4 {
        let engine = Arc::clone(&engine);
        joiners.push(tokio::spawn(async move { engine.join().await.unwrap() }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    let expected = serde_json::to_value(engine.snapshot().await).unwrap();

    let early_frames = drain(&mut early);
    assert_eq!(early_frames.len(), 1 + 160);
    assert_eq!(replay(&early_frames), expected);

    for joiner in joiners {
        let mut observer = joiner.await.unwrap();
        let frames = drain(&mut observer);
        assert_eq!(replay(&frames), expected);
    }
}

#[tokio::test]
async fn test_per_producer_order_preserved_in_stream() {
    let engine = Arc::new(engine());
    let mut observer = engine.join().await.unwrap();

    let a = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            for n in 0..30 {
                engine.process_event(InboundEvent::action("tom", format!("{}", n))).await.unwrap();
            }
        })
    };
    let b = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            for n in 0..30 {
                engine.process_event(InboundEvent::action("support", format!("{}", n))).await.unwrap();
            }
        })
    };
    a.await.unwrap();
    b.await.unwrap();

    let frames = drain(&mut observer);
    for agent in ["tom", "support"] {
        let seen: Vec<u32> = frames[1..]
            .iter()
            .filter(|f| f["agent"] == agent)
            .map(|f| f["data"]["action"].as_str().unwrap().parse().unwrap())
            .collect();
        assert_eq!(seen, (0..30).collect::<Vec<u32>>());
    }
}

#[tokio::test]
async fn test_outbound_events_returned_for_batch() {
    let engine = engine();

    let outbound: Vec<OutboundEvent> = engine
        .process_batch(
            "itombot",
            vec![
                InboundEvent::thinking("itombot", Some("x".to_string())),
                InboundEvent::thinking("itombot", None),
            ],
        )
        .await
        .unwrap();

    assert_eq!(outbound.len(), 2);
    assert!(outbound[0].timestamp <= outbound[1].timestamp);
    assert_eq!(engine.snapshot().await.agents["itombot"].status, AgentStatus::Idle);
}

#[tokio::test]
async fn test_health_facing_accessors() {
    let engine = engine();
    let _observer = engine.join().await.unwrap();

    assert_eq!(
        engine.agent_ids(),
        ["tom", "itombot", "research", "marketing", "support"].map(String::from)
    );
    assert_eq!(engine.hub().observer_count(), 1);
}
