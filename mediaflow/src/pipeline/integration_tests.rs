//! End-to-end tests: registry selection, combined chains and control.

#[cfg(test)]
mod tests {
    use crate::core::{Media, MediaKind, TaskLifecycle};
    use crate::errors::PipelineError;
    use crate::events::{
        CollectingEventSink, LoggingEventSink, PIPELINE_ABORTED, PIPELINE_COMPLETED,
        PIPELINE_CONTROL, PIPELINE_GENERATION, PIPELINE_STARTED,
    };
    use crate::pipeline::{Pipeline, PipelineConfig, PipelineContext, PipelineStart};
    use crate::tasks::{CombinedTask, DoNothingTask, Task, TaskRef};
    use crate::testing::{CallLog, ScriptedTask, ScriptedTransformer, SteppedTask};
    use crate::transform::{
        CombinedTransformer, FnPipelineTransformer, IdentityTransformer, PredicateTransformer,
        Transformer, TransformerRegistry,
    };
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    fn video() -> Media {
        Media::new("lecture", "https://example.org/lecture", MediaKind::Video)
    }

    fn scripted(name: &str, terminate_at: u32, log: &CallLog) -> Arc<dyn Transformer> {
        Arc::new(ScriptedTransformer::new(name, terminate_at).with_log(log.clone()))
    }

    fn combined_pipeline(members: Vec<Arc<dyn Transformer>>) -> Pipeline {
        let combined = CombinedTransformer::new(members).unwrap();
        Pipeline::new(PipelineConfig::new(), PipelineContext::new("combined"))
            .unwrap()
            .with_transformer(combined.pipeline_transformer())
    }

    #[tokio::test]
    async fn test_empty_registry_leaves_chain_untouched() {
        let log = CallLog::new();
        let registry = TransformerRegistry::new();
        let ctx = PipelineContext::new("plain").with_media(video());

        let pipeline = Pipeline::new(PipelineConfig::new(), ctx)
            .unwrap()
            .select_transformer(&registry)
            .unwrap();
        let task: TaskRef = Arc::new(ScriptedTask::new("fetch", 2).with_log(log.clone()));

        let outcome = assert_ok!(pipeline.run(PipelineStart::Task(task)).await);

        assert_eq!(outcome.generations(), 2);
        assert_eq!(outcome.result().unwrap().name(), "fetch");
        assert_eq!(log.entries_with_prefix("run:"), vec!["run:fetch:0", "run:fetch:1"]);
    }

    #[tokio::test]
    async fn test_branches_keep_their_order_every_generation() {
        let log = CallLog::new();
        let pipeline = combined_pipeline(vec![
            scripted("a", 2, &log),
            scripted("b", 2, &log),
            scripted("c", 2, &log),
        ]);

        let outcome = pipeline
            .run(PipelineStart::Task(DoNothingTask::shared()))
            .await
            .unwrap();

        assert_eq!(outcome.generations(), 2);
        assert_eq!(
            log.entries(),
            vec![
                "run:a:0", "run:b:0", "run:c:0",
                "process:a:1", "process:b:1", "process:c:1",
                "run:a:1", "run:b:1", "run:c:1",
            ]
        );

        let names: Vec<&str> = outcome
            .result()
            .unwrap()
            .children()
            .iter()
            .map(|r| r.name())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_chain_ends_when_every_branch_ended() {
        let log = CallLog::new();
        let pipeline = combined_pipeline(vec![scripted("short", 1, &log), scripted("long", 3, &log)]);

        let outcome = pipeline
            .run(PipelineStart::Task(DoNothingTask::shared()))
            .await
            .unwrap();

        assert_eq!(outcome.generations(), 3);
        assert_eq!(
            log.entries_with_prefix("run:"),
            vec![
                "run:short:0", "run:long:0",
                "run:short:1", "run:long:1",
                "run:short:2", "run:long:2",
            ]
        );

        let names: Vec<&str> = outcome
            .result()
            .unwrap()
            .children()
            .iter()
            .map(|r| r.name())
            .collect();
        assert_eq!(names, vec!["short", "long"]);
    }

    #[tokio::test]
    async fn test_termination_is_and_of_branches() {
        let log = CallLog::new();
        let combined =
            CombinedTransformer::new(vec![scripted("short", 1, &log), scripted("long", 3, &log)])
                .unwrap();
        let ctx = PipelineContext::new("and");

        let mut task = combined
            .pipeline_transformer()
            .transform_task(DoNothingTask::shared())
            .unwrap();
        let mut terminating = Vec::new();
        let mut branches = Vec::new();
        loop {
            let result = task.run().await.unwrap().expect("result");
            terminating.push(result.is_terminating());
            branches.push(
                result
                    .children()
                    .iter()
                    .map(|r| r.is_terminating())
                    .collect::<Vec<_>>(),
            );
            if result.is_terminating() {
                break;
            }
            task = result.process(&ctx).await.unwrap();
        }

        assert_eq!(terminating, vec![false, false, true]);
        assert_eq!(
            branches,
            vec![vec![true, false], vec![true, false], vec![true, true]]
        );
    }

    #[tokio::test]
    async fn test_pass_through_members_share_one_run() {
        let log = CallLog::new();
        let pass_through = |name: &str| -> Arc<dyn Transformer> {
            Arc::new(PredicateTransformer::new(
                name,
                |_: &Media| true,
                Arc::new(FnPipelineTransformer::new(Some, Some)),
            ))
        };
        let pipeline = combined_pipeline(vec![
            pass_through("tag"),
            Arc::new(IdentityTransformer),
            pass_through("rename"),
        ]);
        let task: TaskRef = Arc::new(ScriptedTask::new("fetch", 2).with_log(log.clone()));

        let outcome = assert_ok!(pipeline.run(PipelineStart::Task(task)).await);

        assert_eq!(outcome.generations(), 2);
        assert_eq!(
            log.entries(),
            vec!["run:fetch:0", "process:fetch:1", "run:fetch:1"]
        );
        let result = outcome.result().unwrap();
        assert_eq!(result.children().len(), 3);
        assert!(result.children().iter().all(|r| r.name() == "fetch"));
    }

    #[tokio::test]
    async fn test_absent_branch_runs_as_do_nothing() {
        let log = CallLog::new();
        let absent: Arc<dyn Transformer> = Arc::new(
            ScriptedTransformer::new("skip", 1)
                .with_log(log.clone())
                .without_task(),
        );
        let pipeline = combined_pipeline(vec![scripted("a", 1, &log), absent, scripted("c", 1, &log)]);

        let outcome = pipeline
            .run(PipelineStart::Task(DoNothingTask::shared()))
            .await
            .unwrap();

        assert!(outcome.is_completed());
        assert_eq!(log.entries_with_prefix("run:"), vec!["run:a:0", "run:c:0"]);
    }

    #[test]
    fn test_empty_combination_rejected() {
        let err = assert_err!(CombinedTransformer::new(Vec::new()));
        assert_eq!(err.kind(), "EmptyCombination");
        assert_err!(CombinedTask::new(Vec::new()));
    }

    #[tokio::test]
    async fn test_registry_combines_usable_transformers() {
        let log = CallLog::new();
        let registry = TransformerRegistry::new();
        registry
            .register(Arc::new(
                ScriptedTransformer::new("remux", 1)
                    .with_log(log.clone())
                    .for_kinds(&[MediaKind::Video]),
            ))
            .unwrap();
        registry
            .register(Arc::new(
                ScriptedTransformer::new("tag", 1)
                    .with_log(log.clone())
                    .for_kinds(&[MediaKind::Audio]),
            ))
            .unwrap();
        registry
            .register(Arc::new(
                ScriptedTransformer::new("thumbnail", 2)
                    .with_log(log.clone())
                    .for_kinds(&[MediaKind::Video]),
            ))
            .unwrap();

        let ctx = PipelineContext::new("select").with_media(video());
        let pipeline = Pipeline::new(PipelineConfig::new(), ctx)
            .unwrap()
            .select_transformer(&registry)
            .unwrap();

        let outcome = pipeline
            .run(PipelineStart::Task(DoNothingTask::shared()))
            .await
            .unwrap();

        assert_eq!(outcome.generations(), 2);
        assert_eq!(
            log.entries_with_prefix("run:"),
            vec!["run:remux:0", "run:thumbnail:0", "run:remux:1", "run:thumbnail:1"]
        );
    }

    #[tokio::test]
    async fn test_stop_from_another_task_cascades_to_branches() {
        let first = Arc::new(SteppedTask::new("download", 1000, Duration::from_millis(2)));
        let second = Arc::new(SteppedTask::new("subtitles", 1000, Duration::from_millis(2)));
        let start: TaskRef = Arc::new(
            CombinedTask::new(vec![
                Arc::clone(&first) as TaskRef,
                Arc::clone(&second) as TaskRef,
            ])
            .unwrap(),
        );

        let pipeline = Pipeline::new(PipelineConfig::new(), PipelineContext::new("stop")).unwrap();
        let handle = pipeline.handle();
        let running = tokio::spawn(pipeline.run(PipelineStart::Task(start)));

        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.stop();

        let outcome = running.await.unwrap().unwrap();

        assert!(!outcome.is_completed());
        assert_eq!(outcome.generations(), 0);
        assert!(first.completed_steps() < 1000);
        assert_eq!(second.completed_steps(), 0);
        assert_eq!(first.state().current(), TaskLifecycle::Stopped);
        assert_eq!(second.state().current(), TaskLifecycle::Stopped);
        assert!(handle.is_stopped());
    }

    #[tokio::test]
    async fn test_pause_and_resume_from_another_task() {
        let task = Arc::new(SteppedTask::new("download", 40, Duration::from_millis(2)));
        let pipeline = Pipeline::new(PipelineConfig::new(), PipelineContext::new("pause")).unwrap();
        let handle = pipeline.handle();
        let running = tokio::spawn(pipeline.run(PipelineStart::Task(Arc::clone(&task) as TaskRef)));

        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.pause();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let paused_at = task.completed_steps();
        assert_eq!(task.state().current(), TaskLifecycle::Paused);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(task.completed_steps() <= paused_at + 1);

        handle.resume();
        let outcome = running.await.unwrap().unwrap();

        assert!(outcome.is_completed());
        assert_eq!(task.completed_steps(), 40);
        assert_eq!(task.state().current(), TaskLifecycle::Done);
    }

    #[tokio::test]
    async fn test_stop_releases_paused_pipeline() {
        let task = Arc::new(SteppedTask::new("download", 1000, Duration::from_millis(2)));
        let pipeline = Pipeline::new(PipelineConfig::new(), PipelineContext::new("pause")).unwrap();
        let handle = pipeline.handle();
        let running = tokio::spawn(pipeline.run(PipelineStart::Task(Arc::clone(&task) as TaskRef)));

        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.pause();
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.stop();

        let outcome = tokio::time::timeout(Duration::from_secs(5), running)
            .await
            .expect("paused pipeline did not observe stop")
            .unwrap()
            .unwrap();
        assert!(!outcome.is_completed());
        assert_eq!(task.state().current(), TaskLifecycle::Stopped);
    }

    #[tokio::test]
    async fn test_concurrent_pipelines_are_independent() {
        let log = CallLog::new();
        let registry = Arc::new(TransformerRegistry::new());
        registry.register(scripted("convert", 2, &log)).unwrap();

        let runs = (0..4).map(|i| {
            let registry = Arc::clone(&registry);
            async move {
                let ctx = PipelineContext::new(format!("run-{i}")).with_media(video());
                let pipeline = Pipeline::new(PipelineConfig::new(), ctx)?
                    .select_transformer(&registry)?;
                pipeline.run(PipelineStart::Task(DoNothingTask::shared())).await
            }
        });

        let outcomes: Vec<Result<_, PipelineError>> = futures::future::join_all(runs).await;

        for outcome in outcomes {
            assert_eq!(outcome.unwrap().generations(), 2);
        }
        assert_eq!(log.entries_with_prefix("run:convert:0").len(), 4);
        assert_eq!(log.entries_with_prefix("run:convert:1").len(), 4);
    }

    #[tokio::test]
    async fn test_events_describe_the_run() {
        let sink = Arc::new(CollectingEventSink::new());
        let ctx = PipelineContext::new("events")
            .with_media(video())
            .with_event_sink(sink.clone());
        let pipeline = Pipeline::new(PipelineConfig::new().with_name("events"), ctx).unwrap();
        let task: TaskRef = Arc::new(ScriptedTask::new("fetch", 2));

        pipeline.run(PipelineStart::Task(task)).await.unwrap();

        assert_eq!(
            sink.event_types(),
            vec![
                PIPELINE_STARTED,
                PIPELINE_GENERATION,
                PIPELINE_GENERATION,
                PIPELINE_COMPLETED,
            ]
        );
        let completed = sink.last_payload(PIPELINE_COMPLETED).unwrap();
        assert_eq!(completed["generations"], 2);
        assert_eq!(completed["result"], "fetch");
        assert!(completed["media_id"].is_string());
    }

    #[tokio::test]
    async fn test_events_can_be_disabled() {
        let sink = Arc::new(CollectingEventSink::new());
        let ctx = PipelineContext::new("quiet").with_event_sink(sink.clone());
        let pipeline = Pipeline::new(PipelineConfig::new().with_events(false), ctx).unwrap();
        let handle = pipeline.handle();
        handle.stop();

        let outcome = pipeline
            .run(PipelineStart::Task(DoNothingTask::shared()))
            .await
            .unwrap();

        assert!(!outcome.is_completed());
        assert!(sink.is_empty());
        assert!(sink.events_of_type(PIPELINE_ABORTED).is_empty());
    }

    #[tokio::test]
    async fn test_control_requests_are_reported() {
        let sink = Arc::new(CollectingEventSink::new());
        let ctx = PipelineContext::new("control").with_event_sink(sink.clone());
        let pipeline = Pipeline::new(PipelineConfig::new(), ctx).unwrap();
        let handle = pipeline.handle();

        handle.resume();
        handle.stop();
        handle.stop();
        let outcome = pipeline
            .run(PipelineStart::Task(DoNothingTask::shared()))
            .await
            .unwrap();

        assert!(!outcome.is_completed());
        assert_eq!(
            sink.event_types(),
            vec![
                PIPELINE_CONTROL,
                PIPELINE_CONTROL,
                PIPELINE_CONTROL,
                PIPELINE_STARTED,
                PIPELINE_ABORTED,
            ]
        );

        let reported: Vec<(String, bool)> = sink
            .events_of_type(PIPELINE_CONTROL)
            .into_iter()
            .filter_map(|(_, data)| data)
            .map(|data| {
                (
                    data["signal"].as_str().unwrap_or_default().to_string(),
                    data["applied"].as_bool().unwrap_or_default(),
                )
            })
            .collect();
        assert_eq!(
            reported,
            vec![
                ("resume".to_string(), false),
                ("stop".to_string(), true),
                ("stop".to_string(), false),
            ]
        );
    }

    #[tokio::test]
    async fn test_logging_sink_drives_a_combined_chain() {
        let log = CallLog::new();
        let ctx = PipelineContext::new("logged")
            .with_media(video())
            .with_event_sink(Arc::new(LoggingEventSink::debug()));
        let combined =
            CombinedTransformer::new(vec![scripted("a", 1, &log), scripted("b", 2, &log)]).unwrap();
        let pipeline = Pipeline::new(PipelineConfig::new(), ctx)
            .unwrap()
            .with_transformer(combined.pipeline_transformer());
        let handle = pipeline.handle();
        handle.pause();
        handle.resume();

        let outcome = assert_ok!(pipeline.run(PipelineStart::Task(DoNothingTask::shared())).await);

        assert_eq!(outcome.generations(), 2);
    }
}
