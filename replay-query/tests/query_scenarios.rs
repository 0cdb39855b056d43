// End-to-end behaviour of queries fed event sequences through the manager

use replay_query::{
    Emission, Event, Query, QueryManager, QueryParseError, WindowKind, EVALUATION_ERROR_MESSAGE,
};

/// Event where the query-language `ball.x` (native y axis) has the given value
fn ball_x(time: f64, x: f64) -> Event {
    Event::new(time).with_ball(0.0, x)
}

fn emitted_at(query: &mut Query, events: &[Event]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|event| query.add_message(event).map(|_| event.time))
        .collect()
}

#[test]
fn parses_reference_query() {
    let query = Query::parse("IF ball.x < midfield.x\nFOR LAST 2 SECONDS\nTHEN PRINT(\"msg\")\nEVERY 1 SECONDS").unwrap();
    assert_eq!(query.window_kind(), WindowKind::Seconds);
    assert_eq!(query.threshold(), 2.0);
    assert_eq!(query.delay(), 1.0);
    assert_eq!(query.message(), "msg");
    assert_eq!(query.condition(), "ball.y < midfield.x");
}

#[test]
fn seconds_window_emits_once_span_is_covered_then_debounces() {
    let mut query =
        Query::parse("IF ball.x < midfield.x\nFOR LAST 2 SECONDS\nTHEN PRINT(\"msg\")\nEVERY 1 SECONDS").unwrap();
    let events: Vec<Event> = [0.0, 0.6, 1.2, 1.8, 2.4, 3.0, 3.4]
        .iter()
        .map(|&t| ball_x(t, -100.0))
        .collect();
    assert_eq!(emitted_at(&mut query, &events), vec![2.4, 3.4]);
}

#[test]
fn seconds_window_rearms_without_condition_toggling() {
    let mut query = Query::parse("IF ball.x > 0 FOR LAST 1 SECONDS THEN PRINT(\"hold\") EVERY 0.5 SECONDS").unwrap();
    let events: Vec<Event> = (0..=8).map(|i| ball_x(i as f64 * 0.25, 10.0)).collect();
    // 1.0: window covered; then every 0.5s while the streak continues
    assert_eq!(emitted_at(&mut query, &events), vec![1.0, 1.5, 2.0]);
    assert_eq!(query.state().fit_count, 9);
    assert_eq!(query.state().first_fit, 0.0);
}

#[test]
fn entries_window_ignores_delay() {
    let mut query = Query::parse("IF ball.x > 0 FOR LAST 3 ENTRIES THEN PRINT(\"x\") EVERY 100 SECONDS").unwrap();
    let events: Vec<Event> = (0..5).map(|i| ball_x(i as f64, 1.0)).collect();
    assert_eq!(emitted_at(&mut query, &events), vec![2.0, 3.0, 4.0]);
}

#[test]
fn never_correct_never_emits() {
    let mut query = Query::parse("IF ball.x > 1000 FOR LAST 0 ENTRIES THEN PRINT(\"x\") EVERY 0 SECONDS").unwrap();
    let events: Vec<Event> = (0..50).map(|i| ball_x(i as f64 * 0.1, (i * 10) as f64)).collect();
    assert!(emitted_at(&mut query, &events).is_empty());
}

#[test]
fn incomplete_player_data_is_not_penalised() {
    let mut query =
        Query::parse("IF player.2.x > 0 FOR LAST 2 ENTRIES THEN PRINT(\"p2\") EVERY 0 SECONDS").unwrap();
    // No data for player 2 yet
    assert_eq!(query.add_message(&Event::new(0.0).with_player(1, 5.0, 5.0)), None);
    assert_eq!(query.state().fit_count, 0);
    // Native y axis carries query-language x
    assert_eq!(query.add_message(&Event::new(0.1).with_player(2, 0.0, 5.0)), None);
    assert_eq!(query.state().fit_count, 1);
    assert_eq!(query.state().first_fit, 0.1);
    assert_eq!(query.add_message(&Event::new(0.2)), None);
    assert_eq!(
        query.add_message(&Event::new(0.3).with_player(2, 0.0, 5.0)),
        Some(Emission::Message("p2".to_string()))
    );
}

#[test]
fn incorrect_resets_accumulated_progress() {
    let mut query = Query::parse("IF ball.x > 0 FOR LAST 1 SECONDS THEN PRINT(\"x\") EVERY 0 SECONDS").unwrap();
    let events = vec![
        ball_x(0.0, 1.0),
        ball_x(0.9, 1.0),
        ball_x(1.0, -1.0),
        ball_x(1.5, 1.0),
        ball_x(2.4, 1.0),
        ball_x(2.5, 1.0),
    ];
    assert_eq!(emitted_at(&mut query, &events), vec![2.5]);
}

#[test]
fn message_text_is_never_evaluated() {
    let mut manager = QueryManager::from_batch(
        "IF ball.x > 0\nFOR LAST 1 ENTRIES\nTHEN PRINT(\"__import__('os').system('rm -rf /')\")\nEVERY 0 SECONDS",
    )
    .unwrap();
    let mut output: Vec<String> = Vec::new();
    manager.add_message(&ball_x(0.0, 1.0), &mut output);
    assert_eq!(output, vec!["__import__('os').system('rm -rf /')"]);
}

#[test]
fn injection_attempts_in_condition_are_diagnostics() {
    let mut manager = QueryManager::from_batch(
        "IF __import__('os').system('true') == 0 FOR LAST 1 ENTRIES THEN PRINT(\"x\") EVERY 0 SECONDS\n\n\
         IF ball.x.__class__ FOR LAST 1 ENTRIES THEN PRINT(\"y\") EVERY 0 SECONDS",
    )
    .unwrap();
    let mut output: Vec<String> = Vec::new();
    manager.add_message(&ball_x(0.0, 1.0), &mut output);
    assert_eq!(output, vec![EVALUATION_ERROR_MESSAGE, EVALUATION_ERROR_MESSAGE]);
}

#[test]
fn evaluation_errors_do_not_halt_other_queries() {
    let mut manager = QueryManager::from_batch(
        "IF ball.x / 0 > 1 FOR LAST 1 ENTRIES THEN PRINT(\"broken\") EVERY 0 SECONDS\n\n\
         IF ball.x > 0 FOR LAST 2 ENTRIES THEN PRINT(\"ok\") EVERY 0 SECONDS",
    )
    .unwrap();
    let mut output: Vec<String> = Vec::new();
    for i in 0..3 {
        manager.add_message(&ball_x(i as f64, 1.0), &mut output);
    }
    assert_eq!(
        output,
        vec![
            EVALUATION_ERROR_MESSAGE,
            EVALUATION_ERROR_MESSAGE,
            "ok",
            EVALUATION_ERROR_MESSAGE,
            "ok",
        ]
    );
    let stats = manager.stats();
    assert_eq!(stats.events, 3);
    assert_eq!(stats.messages, 2);
    assert_eq!(stats.diagnostics, 3);
}

#[test]
fn fresh_manager_starts_idle() {
    let batch = "IF ball.x > 0 FOR LAST 2 ENTRIES THEN PRINT(\"x\") EVERY 0 SECONDS";
    let mut first = QueryManager::from_batch(batch).unwrap();
    let mut sink: Vec<String> = Vec::new();
    first.add_message(&ball_x(0.0, 1.0), &mut sink);

    // A cancelled run leaves nothing behind for the next one
    let mut second = QueryManager::from_batch(batch).unwrap();
    second.add_message(&ball_x(0.0, 1.0), &mut sink);
    assert!(sink.is_empty());
    assert_eq!(second.queries()[0].state().fit_count, 1);
}

#[test]
fn for_without_last_is_rejected() {
    let err = QueryManager::from_batch("IF ball.x > 0\nFOR 2 SECONDS\nTHEN PRINT(\"x\")\nEVERY 1 SECONDS").unwrap_err();
    assert_eq!(err.position, 1);
    assert_eq!(err.source, QueryParseError::MalformedFor);
    assert!(err.to_string().contains("FOR LAST"));
}
