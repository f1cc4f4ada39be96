//! End-to-end interaction scenarios on the system clock
//!
//! Timings are shortened through the config; only the speech clip keeps a
//! realistic length where the scenario depends on it.

mod common;

use billy::actuator::{Actuator, Direction, DriverCommand, Intensity};
use billy::interaction::{
    ActivationOutcome, InteractionOutcome, InteractionPhase, InteractionReport, RigEvent,
};
use common::*;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(10);

fn split(report: &InteractionReport, phase: InteractionPhase) -> Option<u64> {
    let label = phase.to_string();
    report.phases.iter().find(|s| s.phase == label).map(|s| s.millis)
}

#[test]
fn test_joke_scenario() {
    let bench = bench(quick_config(), |clock| {
        ScriptedVoice::new(clock).with_speech(Duration::from_millis(2400))
    });
    let max_step = quick_config().timing.animation_step() + quick_config().timing.animation_jitter();
    let handle = bench.handle.clone();
    let thread = bench.orchestrator.start().unwrap();

    let outcome = handle.activate(press(1));
    assert!(matches!(outcome, ActivationOutcome::Started(_)));
    let report = handle.wait_for_report(WAIT).expect("interaction finished");

    assert_eq!(report.outcome, InteractionOutcome::Completed);
    assert_eq!(report.activation_sequence, Some(1));
    assert!(report.activation_lag_ms.is_some());
    assert_eq!(report.transcript.as_deref(), Some("tell me a joke"));
    assert_eq!(report.response.as_deref(), Some(JOKE));
    assert_eq!(report.speech_ms, Some(2400));
    assert!(!report.speech_estimated);
    assert_eq!(bench.voice.spoken(), vec![JOKE.to_string()]);

    // Speaking lasts the clip, plus at most one animation step and scheduling slack
    let speaking = split(&report, InteractionPhase::Speaking).unwrap();
    assert!(speaking >= 2400, "speaking took {} ms", speaking);
    assert!(
        speaking <= 2400 + max_step.as_millis() as u64 + 200,
        "speaking took {} ms",
        speaking
    );
    let (start, end) = bench.voice.playbacks()[0];
    assert!(end - start >= Duration::from_millis(2400));

    let history = bench.driver.history();
    let mouth = directions(&history, Actuator::Mouth);
    assert!(mouth.len() >= 10);
    assert_eq!(mouth[0], Direction::Forward);
    assert!(mouth.windows(2).all(|w| w[0] != w[1]));
    assert!(!directions(&history, Actuator::Tail).is_empty());

    // Body: out, hold, back, release
    let body: Vec<_> = history
        .iter()
        .filter(|c| c.actuator() == Actuator::Body)
        .copied()
        .collect();
    assert_eq!(
        body[0],
        DriverCommand::Set(Actuator::Body, Direction::Forward, Intensity::MAX)
    );
    assert_eq!(body[1], DriverCommand::Brake(Actuator::Body));
    assert!(body.contains(&DriverCommand::Set(Actuator::Body, Direction::Reverse, Intensity::MAX)));

    assert!(handle.port().all_stopped());
    assert!(!handle.is_busy());
    assert!(handle.state().is_idle());

    handle.shutdown().unwrap();
    thread.join().unwrap();
}

#[test]
fn test_no_transcript_apologizes_without_responding() {
    let bench = bench(quick_config(), |clock| {
        ScriptedVoice::new(clock).with_fault(Fault::NoTranscript)
    });
    let handle = bench.handle.clone();
    let thread = bench.orchestrator.start().unwrap();

    handle.activate(press(1));
    let report = handle.wait_for_report(WAIT).unwrap();

    assert_eq!(report.outcome, InteractionOutcome::Aborted);
    assert_eq!(report.transcript, None);
    assert_eq!(report.response, None);
    assert!(report.error.as_deref().unwrap().contains("No transcript"));
    assert_eq!(CallCounts::get(&bench.voice.calls.respond), 0);
    assert_eq!(bench.voice.spoken(), vec![APOLOGY.to_string()]);
    assert_eq!(CallCounts::get(&bench.voice.calls.play), 1);
    assert!(split(&report, InteractionPhase::Aborting).is_some());

    // The apology is animated like any other speech
    assert!(!directions(&bench.driver.history(), Actuator::Mouth).is_empty());
    assert!(handle.port().all_stopped());
    assert!(!handle.is_busy());

    handle.shutdown().unwrap();
    thread.join().unwrap();
}

#[test]
fn test_second_activation_is_dropped() {
    let bench = bench(quick_config(), |clock| {
        ScriptedVoice::new(clock).with_speech(Duration::from_millis(1200))
    });
    let handle = bench.handle.clone();
    let thread = bench.orchestrator.start().unwrap();

    assert!(matches!(handle.activate(press(1)), ActivationOutcome::Started(_)));
    std::thread::sleep(Duration::from_millis(500));
    assert_eq!(handle.activate(press(2)), ActivationOutcome::Dropped);

    let report = handle.wait_for_report(WAIT).unwrap();
    assert_eq!(report.outcome, InteractionOutcome::Completed);
    assert_eq!(CallCounts::get(&bench.voice.calls.record), 1);

    let snapshot = handle.state().snapshot();
    assert_eq!(snapshot.completed, 1);
    assert_eq!(snapshot.dropped_activations, 1);

    // Nothing else queued behind it
    assert!(handle.wait_for_report(Duration::from_millis(200)).is_none());
    assert!(!handle.is_busy());

    handle.shutdown().unwrap();
    thread.join().unwrap();
}

#[test]
fn test_dropped_activation_is_published() {
    let bench = bench(quick_config(), ScriptedVoice::new);
    let _session = bench.orchestrator.open_session().unwrap();

    assert_eq!(bench.handle.activate(press(7)), ActivationOutcome::Dropped);
    match bench.handle.try_recv_event() {
        Some(RigEvent::ActivationDropped(activation)) => assert_eq!(activation.sequence, 7),
        other => panic!("unexpected event {:?}", other),
    }
    assert!(bench.driver.history().is_empty());
}

#[test]
fn test_panicking_collaborator_is_contained() {
    let bench = bench(quick_config(), |clock| {
        ScriptedVoice::new(clock).with_fault(Fault::RespondPanics)
    });
    let handle = bench.handle.clone();
    let thread = bench.orchestrator.start().unwrap();

    handle.activate(press(1));
    let report = handle.wait_for_report(WAIT).unwrap();
    assert_eq!(report.outcome, InteractionOutcome::Crashed);
    assert!(report.error.as_deref().unwrap().contains("response generator exploded"));
    assert!(handle.port().all_stopped());
    assert!(!handle.is_busy());

    // The control thread survived and takes the next press
    assert!(matches!(handle.activate(press(2)), ActivationOutcome::Started(_)));
    assert!(handle.wait_for_report(WAIT).is_some());
    assert_eq!(handle.state().snapshot().crashed, 2);

    handle.shutdown().unwrap();
    thread.join().unwrap();
}

#[test]
fn test_playback_failure_cancels_animation() {
    let bench = bench(quick_config(), |clock| {
        ScriptedVoice::new(clock)
            .with_speech(Duration::from_secs(5))
            .with_fault(Fault::PlaybackFails)
    });
    let handle = bench.handle.clone();
    let thread = bench.orchestrator.start().unwrap();

    let started = Instant::now();
    handle.activate(press(1));
    let report = handle.wait_for_report(WAIT).unwrap();

    assert_eq!(report.outcome, InteractionOutcome::Aborted);
    assert!(report.error.as_deref().unwrap().contains("speaker disconnected"));
    // Neither the reply nor the apology animated for the full clip
    assert!(started.elapsed() < Duration::from_secs(4));
    assert!(handle.port().all_stopped());

    handle.shutdown().unwrap();
    thread.join().unwrap();
}

#[test]
fn test_unknown_duration_uses_fallback() {
    let bench = bench(quick_config(), |clock| {
        ScriptedVoice::new(clock).with_fault(Fault::UnknownDuration)
    });
    let handle = bench.handle.clone();
    let thread = bench.orchestrator.start().unwrap();

    handle.activate(press(1));
    let report = handle.wait_for_report(WAIT).unwrap();
    assert_eq!(report.outcome, InteractionOutcome::Completed);
    assert_eq!(report.speech_ms, Some(120));
    assert!(report.speech_estimated);

    handle.shutdown().unwrap();
    thread.join().unwrap();
}

#[test]
fn test_failing_backend_speaks_fallback() {
    let bench = bench(quick_config(), |clock| {
        ScriptedVoice::new(clock).with_fault(Fault::BackendFails)
    });
    let session = bench.orchestrator.open_session().unwrap();
    let report = bench.orchestrator.run_interaction(session);

    assert_eq!(report.outcome, InteractionOutcome::Completed);
    assert_eq!(report.response.as_deref(), Some(FALLBACK));
    assert_eq!(CallCounts::get(&bench.voice.calls.respond), 1);
    assert_eq!(bench.voice.spoken(), vec![FALLBACK.to_string()]);
    assert_eq!(bench.voice.playbacks().len(), 1);
}

#[test]
fn test_broken_animation_lets_playback_finish() {
    use billy::actuator::{ActuatorDriver, ActuatorPort};
    use billy::animation::RngSource;
    use billy::interaction::Orchestrator;
    use billy::utils::SystemClock;
    use std::sync::Arc;

    let clock = SystemClock::shared();
    let driver = Arc::new(BrokenDriver::new(&[Actuator::Mouth, Actuator::Tail]));
    let voice = Arc::new(ScriptedVoice::new(clock.clone()).with_speech(Duration::from_millis(600)));
    let config = quick_config();
    let port = Arc::new(ActuatorPort::new(driver.clone() as Arc<dyn ActuatorDriver>));
    let (orchestrator, handle) = Orchestrator::new(
        config.clone(),
        port,
        collaborators(&config, voice.clone()),
        clock,
        Box::new(RngSource::seeded(4)),
    );

    let session = orchestrator.open_session().unwrap();
    let report = orchestrator.run_interaction(session);

    assert_eq!(report.outcome, InteractionOutcome::Completed);
    assert_eq!(report.error, None);
    let playbacks = voice.playbacks();
    assert_eq!(playbacks.len(), 1);
    let (start, end) = playbacks[0];
    assert!(end - start >= Duration::from_millis(600), "played {:?}", end - start);
    assert!(split(&report, InteractionPhase::Speaking).unwrap() >= 600);

    // The body still moved; mouth and tail never did
    assert!(!directions(&driver.history(), Actuator::Body).is_empty());
    assert!(directions(&driver.history(), Actuator::Mouth).is_empty());
    assert!(handle.port().all_stopped());
    assert!(!handle.is_busy());
}

#[test]
fn test_idle_event_means_ready_for_next_press() {
    let bench = bench(quick_config(), ScriptedVoice::new);
    let handle = bench.handle.clone();
    let thread = bench.orchestrator.start().unwrap();

    assert!(matches!(handle.activate(press(1)), ActivationOutcome::Started(_)));
    let mut second = None;
    let mut finished = 0;
    while finished < 2 {
        match handle.recv_event_timeout(WAIT).expect("event before timeout") {
            RigEvent::PhaseChanged(InteractionPhase::Idle) if second.is_none() => {
                second = Some(handle.activate(press(2)));
            }
            RigEvent::InteractionFinished(_) => finished += 1,
            _ => {}
        }
    }
    assert!(matches!(second, Some(ActivationOutcome::Started(_))));
    assert_eq!(handle.state().snapshot().dropped_activations, 0);

    handle.shutdown().unwrap();
    thread.join().unwrap();
}

#[test]
fn test_shutdown_mid_interaction_wins() {
    let bench = bench(quick_config(), |clock| {
        ScriptedVoice::new(clock).with_speech(Duration::from_millis(800))
    });
    let handle = bench.handle.clone();
    let thread = bench.orchestrator.start().unwrap();

    handle.activate(press(1));
    std::thread::sleep(Duration::from_millis(200));
    handle.shutdown().unwrap();
    assert!(handle.port().is_locked_out());

    // Only releases reach the driver once locked out
    let at_stop = bench.driver.history().len();
    thread.join().unwrap();
    let after: Vec<_> = bench.driver.history()[at_stop..].to_vec();
    assert!(after.iter().all(|c| matches!(c, DriverCommand::Release(_))));

    assert!(handle.port().all_stopped());
    assert!(!handle.is_busy());
    assert_eq!(bench.voice.calls.record.load(Ordering::SeqCst), 1);
}

#[test]
fn test_button_press_runs_one_interaction() {
    use billy::actuator::SimulatedDriver;
    use billy::animation::RngSource;
    use billy::rig::Rig;
    use billy::utils::SystemClock;
    use std::sync::Arc;

    // Released, then a bouncy press held for a while
    let mut levels = vec![Ok(true); 3];
    levels.extend([Ok(false), Ok(true), Ok(false), Ok(true), Ok(false)]);
    levels.extend((0..20).map(|_| Ok(false)));
    levels.push(Ok(true));

    let clock = SystemClock::shared();
    let voice = Arc::new(ScriptedVoice::new(clock.clone()));
    let config = quick_config().with_button_timing(5, 200);
    let rig = Rig::builder()
        .with_config(config.clone())
        .with_driver(Arc::new(SimulatedDriver::new()))
        .with_input(Arc::new(ScriptedInput::new(levels)))
        .with_collaborators(collaborators(&config, voice.clone()))
        .with_clock(clock)
        .with_random(Box::new(RngSource::seeded(9)))
        .build()
        .unwrap();

    let handle = rig.start().unwrap();
    let report = handle.orchestrator().wait_for_report(WAIT).unwrap();
    assert_eq!(report.outcome, InteractionOutcome::Completed);
    assert_eq!(report.activation_sequence, Some(1));
    // The edge goes straight from the poller into the gate
    assert!(report.activation_lag_ms.unwrap() < 1000);

    // Bounces were debounced away
    assert!(handle.orchestrator().wait_for_report(Duration::from_millis(300)).is_none());
    assert_eq!(CallCounts::get(&voice.calls.record), 1);
    assert_eq!(handle.orchestrator().state().snapshot().dropped_activations, 0);

    handle.shutdown().unwrap();
}
