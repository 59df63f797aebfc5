//! Course progress tracking.
//!
//! A progress record mirrors the module/lesson shape of its course. Lesson
//! events are the only thing that moves lessons forward; module flags and the
//! overall percentage are derived after every mutation, against the course
//! structure as the catalog reports it at that moment.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::{AcademyError, AcademyResult};
use crate::models::{
    Course, Enrollment, LessonEvent, LessonProgress, ModuleProgress, ProgressRecord,
};
use crate::store::{CatalogSource, Latency, ProgressStore};

/// Share of a lesson's duration that must be watched to complete it.
pub const COMPLETION_THRESHOLD: f64 = 0.9;

pub fn percentage(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (100.0 * completed as f64 / total as f64).clamp(0.0, 100.0)
}

pub fn watched_enough(watch_time: f64, duration_secs: u32) -> bool {
    watch_time > 0.0 && watch_time >= COMPLETION_THRESHOLD * f64::from(duration_secs)
}

impl ProgressRecord {
    /// Zeroed record mirroring `course`.
    pub fn initialize(user_id: &str, course: &Course, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            course_id: course.id.clone(),
            start_date: now,
            last_access_date: now,
            completed_lessons: Vec::new(),
            module_progress: course
                .modules
                .iter()
                .map(|m| ModuleProgress {
                    module_id: m.id.clone(),
                    completed: false,
                    lesson_progress: m.lessons.iter().map(|l| LessonProgress::new(&l.id)).collect(),
                })
                .collect(),
            overall_progress: 0.0,
            certificate_issued: false,
            certificate_issued_at: None,
        }
    }

    pub fn lesson(&self, lesson_id: &str) -> Option<&LessonProgress> {
        self.module_progress
            .iter()
            .flat_map(|m| m.lesson_progress.iter())
            .find(|l| l.lesson_id == lesson_id)
    }

    // Entry for a lesson, created when the course gained the lesson after
    // this record was initialized.
    fn lesson_entry(&mut self, module_id: &str, lesson_id: &str) -> &mut LessonProgress {
        let m_idx = match self.module_progress.iter().position(|m| {
            m.lesson_progress.iter().any(|l| l.lesson_id == lesson_id)
        }) {
            Some(idx) => idx,
            None => {
                let idx = match self.module_progress.iter().position(|m| m.module_id == module_id) {
                    Some(idx) => idx,
                    None => {
                        self.module_progress.push(ModuleProgress {
                            module_id: module_id.to_string(),
                            completed: false,
                            lesson_progress: Vec::new(),
                        });
                        self.module_progress.len() - 1
                    }
                };
                self.module_progress[idx]
                    .lesson_progress
                    .push(LessonProgress::new(lesson_id));
                idx
            }
        };
        let lessons = &mut self.module_progress[m_idx].lesson_progress;
        let l_idx = lessons
            .iter()
            .position(|l| l.lesson_id == lesson_id)
            .unwrap_or(lessons.len() - 1);
        &mut lessons[l_idx]
    }

    fn mark_completed(&mut self, lesson_id: &str) {
        if !self.completed_lessons.iter().any(|id| id == lesson_id) {
            self.completed_lessons.push(lesson_id.to_string());
        }
    }

    /// Bring the record in line with `course` and re-derive module flags and
    /// the overall percentage. Lessons the course gained since the record was
    /// created get zeroed entries.
    pub fn recompute(&mut self, course: &Course) {
        for module in &course.modules {
            for lesson in &module.lessons {
                self.lesson_entry(&module.id, &lesson.id);
            }
        }
        for progress in &mut self.module_progress {
            let completed = |l: &LessonProgress| l.completed;
            progress.completed = match course.modules.iter().find(|m| m.id == progress.module_id) {
                Some(module) => module.lessons.iter().all(|lesson| {
                    progress
                        .lesson_progress
                        .iter()
                        .find(|l| l.lesson_id == lesson.id)
                        .is_some_and(completed)
                }),
                None => progress.lesson_progress.iter().all(completed),
            };
        }
        self.overall_progress = percentage(self.completed_lessons.len(), course.total_lessons());
    }

    pub fn certificate_eligible(&self) -> bool {
        self.overall_progress >= 100.0
    }
}

fn validate_event(event: &LessonEvent) -> AcademyResult<()> {
    for (field, value) in [
        ("watch_time", event.watch_time),
        ("last_position", event.last_position),
    ] {
        if let Some(v) = value {
            if !v.is_finite() || v < 0.0 {
                return Err(AcademyError::validation(format!(
                    "{field} must be a non-negative number"
                )));
            }
        }
    }
    Ok(())
}

#[derive(Clone)]
pub struct ProgressService {
    catalog: Arc<dyn CatalogSource>,
    store: Arc<dyn ProgressStore>,
    latency: Latency,
}

impl ProgressService {
    pub fn new(catalog: Arc<dyn CatalogSource>, store: Arc<dyn ProgressStore>, latency: Latency) -> Self {
        Self { catalog, store, latency }
    }

    async fn course(&self, course_id: &str) -> AcademyResult<Course> {
        self.catalog
            .course(course_id)
            .await?
            .ok_or_else(|| AcademyError::not_found("course", course_id))
    }

    /// Create the record for (user, course) unless one already exists.
    pub async fn initialize_progress(&self, user_id: &str, course_id: &str) -> AcademyResult<ProgressRecord> {
        if let Some(existing) = self.store.load(user_id, course_id).await? {
            return Ok(existing);
        }
        let course = self.course(course_id).await?;
        let record = ProgressRecord::initialize(user_id, &course, Utc::now());
        self.store.save(&record).await?;
        tracing::debug!(user_id, course_id, "initialized progress");
        Ok(record)
    }

    /// Discard all progress for (user, course) and start again from zero.
    pub async fn reset_progress(&self, user_id: &str, course_id: &str) -> AcademyResult<ProgressRecord> {
        let course = self.course(course_id).await?;
        let record = ProgressRecord::initialize(user_id, &course, Utc::now());
        self.store.save(&record).await?;
        tracing::info!(user_id, course_id, "progress reset");
        Ok(record)
    }

    pub async fn get_progress(&self, user_id: &str, course_id: &str) -> AcademyResult<ProgressRecord> {
        if let Some(record) = self.store.load(user_id, course_id).await? {
            return Ok(record);
        }
        self.latency.simulate().await;
        self.initialize_progress(user_id, course_id).await
    }

    pub async fn record_lesson_event(
        &self,
        user_id: &str,
        course_id: &str,
        lesson_id: &str,
        event: LessonEvent,
    ) -> AcademyResult<ProgressRecord> {
        validate_event(&event)?;

        let course = self.course(course_id).await?;
        let (module, lesson) = course
            .find_lesson(lesson_id)
            .ok_or_else(|| AcademyError::not_found("lesson", lesson_id))?;

        let mut record = self.get_progress(user_id, course_id).await?;

        let entry = record.lesson_entry(&module.id, &lesson.id);
        if let Some(watch_time) = event.watch_time {
            entry.watch_time = watch_time;
        }
        if let Some(last_position) = event.last_position {
            entry.last_position = last_position;
        }
        if let Some(quiz_results) = event.quiz_results {
            entry.quiz_results = quiz_results;
        }

        // completion never reverts, even if a later event reports less
        let newly_completed = !entry.completed && watched_enough(entry.watch_time, lesson.duration_secs);
        if newly_completed {
            entry.completed = true;
        }
        if entry.completed {
            record.mark_completed(lesson_id);
        }

        // totals come from the current structure, not the one at initialization
        let course = self.course(course_id).await?;
        record.recompute(&course);
        record.last_access_date = Utc::now();

        self.store.save(&record).await?;
        if newly_completed {
            tracing::info!(
                user_id,
                course_id,
                lesson_id,
                overall = record.overall_progress,
                "lesson completed"
            );
        }
        Ok(record)
    }

    /// Flip `certificate_issued` once the course is fully complete. Issuing
    /// again is a no-op.
    pub async fn issue_certificate(&self, user_id: &str, course_id: &str) -> AcademyResult<ProgressRecord> {
        let course = self.course(course_id).await?;
        if !course.certificate {
            return Err(AcademyError::validation(format!(
                "course {course_id} does not award a certificate"
            )));
        }
        let mut record = self.get_progress(user_id, course_id).await?;
        if record.certificate_issued {
            return Ok(record);
        }
        if !record.certificate_eligible() {
            return Err(AcademyError::validation(format!(
                "course {course_id} is {:.0}% complete",
                record.overall_progress
            )));
        }
        record.certificate_issued = true;
        record.certificate_issued_at = Some(Utc::now());
        self.store.save(&record).await?;
        tracing::info!(user_id, course_id, "certificate issued");
        Ok(record)
    }

    pub async fn enroll(&self, user_id: &str, course_id: &str) -> AcademyResult<Enrollment> {
        self.latency.simulate().await;
        let record = self.initialize_progress(user_id, course_id).await?;
        tracing::info!(user_id, course_id, "enrolled");
        Ok(Enrollment {
            user_id: user_id.to_string(),
            course_id: course_id.to_string(),
            enrollment_date: Utc::now(),
            progress: record.overall_progress,
            last_access_date: record.last_access_date,
            status: "active".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::models::{Lesson, Module, QuizResult};
    use crate::store::{KvProgressStore, MemoryKeyValueStore};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use tokio::sync::RwLock;

    fn service() -> ProgressService {
        let catalog = Arc::new(StaticCatalog::bundled(Latency::NONE).unwrap());
        let store = Arc::new(KvProgressStore::new(Arc::new(MemoryKeyValueStore::new())));
        ProgressService::new(catalog, store, Latency::NONE)
    }

    fn watched(secs: f64) -> LessonEvent {
        LessonEvent { watch_time: Some(secs), ..Default::default() }
    }

    // course-001 lesson durations in seconds
    const L1: f64 = 1500.0;
    const L2: f64 = 1800.0;
    const L3: f64 = 2400.0;
    const L4: f64 = 2100.0;

    #[tokio::test]
    async fn fresh_progress_is_all_zero() {
        let p = service().get_progress("u1", "course-001").await.unwrap();
        assert_eq!(p.overall_progress, 0.0);
        assert!(p.completed_lessons.is_empty());
        assert!(!p.certificate_issued);
        assert_eq!(p.module_progress.len(), 2);
        for m in &p.module_progress {
            assert!(!m.completed);
            assert_eq!(m.lesson_progress.len(), 3);
            assert!(m.lesson_progress.iter().all(|l| !l.completed && l.watch_time == 0.0));
        }
    }

    #[tokio::test]
    async fn initialize_does_not_clobber_existing_progress() {
        let svc = service();
        svc.record_lesson_event("u1", "course-001", "lesson-001", watched(L1)).await.unwrap();
        let again = svc.initialize_progress("u1", "course-001").await.unwrap();
        assert_eq!(again.completed_lessons, vec!["lesson-001".to_string()]);
    }

    #[tokio::test]
    async fn reset_returns_to_zero() {
        let svc = service();
        svc.record_lesson_event("u1", "course-001", "lesson-001", watched(L1)).await.unwrap();
        let reset = svc.reset_progress("u1", "course-001").await.unwrap();
        assert_eq!(reset.overall_progress, 0.0);
        let stored = svc.get_progress("u1", "course-001").await.unwrap();
        assert!(stored.completed_lessons.is_empty());
    }

    #[tokio::test]
    async fn completion_threshold_is_ninety_percent() {
        let svc = service();
        let p = svc
            .record_lesson_event("u1", "course-001", "lesson-001", watched(0.89 * L1))
            .await
            .unwrap();
        assert!(!p.lesson("lesson-001").unwrap().completed);
        assert!(p.completed_lessons.is_empty());

        let p = svc
            .record_lesson_event("u1", "course-001", "lesson-001", watched(0.9 * L1))
            .await
            .unwrap();
        assert!(p.lesson("lesson-001").unwrap().completed);
    }

    #[tokio::test]
    async fn repeated_completion_is_recorded_once() {
        let svc = service();
        for _ in 0..3 {
            svc.record_lesson_event("u1", "course-001", "lesson-002", watched(L2)).await.unwrap();
        }
        let p = svc.get_progress("u1", "course-001").await.unwrap();
        assert_eq!(
            p.completed_lessons.iter().filter(|id| *id == "lesson-002").count(),
            1
        );
    }

    #[tokio::test]
    async fn completion_is_monotonic() {
        let svc = service();
        svc.record_lesson_event("u1", "course-001", "lesson-001", watched(L1)).await.unwrap();
        let p = svc
            .record_lesson_event("u1", "course-001", "lesson-001", watched(10.0))
            .await
            .unwrap();
        let lesson = p.lesson("lesson-001").unwrap();
        assert!(lesson.completed);
        assert_eq!(lesson.watch_time, 10.0);
        assert_eq!(p.completed_lessons.len(), 1);
    }

    #[tokio::test]
    async fn three_lessons_across_modules_is_half_done() {
        let svc = service();
        svc.record_lesson_event("u1", "course-001", "lesson-001", watched(L1)).await.unwrap();
        svc.record_lesson_event("u1", "course-001", "lesson-002", watched(L2)).await.unwrap();
        let p = svc
            .record_lesson_event("u1", "course-001", "lesson-004", watched(L4))
            .await
            .unwrap();
        assert_eq!(p.overall_progress, 50.0);
        assert!(p.module_progress.iter().all(|m| !m.completed));
    }

    #[tokio::test]
    async fn three_lessons_in_one_module_completes_it() {
        let svc = service();
        svc.record_lesson_event("u1", "course-001", "lesson-001", watched(L1)).await.unwrap();
        let p = svc
            .record_lesson_event("u1", "course-001", "lesson-002", watched(L2))
            .await
            .unwrap();
        assert!(!p.module_progress[0].completed);

        let p = svc
            .record_lesson_event("u1", "course-001", "lesson-003", watched(L3))
            .await
            .unwrap();
        assert_eq!(p.overall_progress, 50.0);
        assert!(p.module_progress[0].completed);
        assert!(!p.module_progress[1].completed);
    }

    #[tokio::test]
    async fn partial_fields_merge_without_resetting_others() {
        let svc = service();
        svc.record_lesson_event("u1", "course-001", "lesson-003", watched(120.0)).await.unwrap();
        let quiz = vec![QuizResult { quiz: "principios-basicos".into(), score: 80.0, passed: true }];
        let p = svc
            .record_lesson_event(
                "u1",
                "course-001",
                "lesson-003",
                LessonEvent {
                    last_position: Some(118.5),
                    quiz_results: Some(quiz.clone()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let lesson = p.lesson("lesson-003").unwrap();
        assert_eq!(lesson.watch_time, 120.0);
        assert_eq!(lesson.last_position, 118.5);
        assert_eq!(lesson.quiz_results, quiz);
        assert_eq!(lesson.state(), crate::models::LessonState::InProgress);
    }

    #[tokio::test]
    async fn unknown_lesson_is_not_found() {
        let err = service()
            .record_lesson_event("u1", "course-001", "lesson-201", watched(1.0))
            .await
            .unwrap_err();
        assert_matches!(err, AcademyError::NotFound { entity: "lesson", .. });
    }

    #[tokio::test]
    async fn negative_watch_time_is_rejected() {
        let err = service()
            .record_lesson_event("u1", "course-001", "lesson-001", watched(-5.0))
            .await
            .unwrap_err();
        assert_matches!(err, AcademyError::Validation(_));
    }

    #[tokio::test]
    async fn certificate_requires_full_completion_and_sticks() {
        let svc = service();
        assert_matches!(
            svc.issue_certificate("u1", "course-001").await,
            Err(AcademyError::Validation(_))
        );

        let durations = [
            ("lesson-001", L1),
            ("lesson-002", L2),
            ("lesson-003", L3),
            ("lesson-004", L4),
            ("lesson-005", 2700.0),
            ("lesson-006", 3000.0),
        ];
        for (id, secs) in durations {
            svc.record_lesson_event("u1", "course-001", id, watched(secs)).await.unwrap();
        }
        let p = svc.get_progress("u1", "course-001").await.unwrap();
        assert_eq!(p.overall_progress, 100.0);
        assert!(p.module_progress.iter().all(|m| m.completed));

        let p = svc.issue_certificate("u1", "course-001").await.unwrap();
        assert!(p.certificate_issued);

        let p = svc
            .record_lesson_event("u1", "course-001", "lesson-006", watched(1.0))
            .await
            .unwrap();
        assert!(p.certificate_issued);
    }

    #[tokio::test]
    async fn course_without_certificate_refuses_issuance() {
        assert_matches!(
            service().issue_certificate("u1", "course-004").await,
            Err(AcademyError::Validation(_))
        );
    }

    #[tokio::test]
    async fn enroll_creates_zero_progress() {
        let svc = service();
        let enrollment = svc.enroll("u1", "course-002").await.unwrap();
        assert_eq!(enrollment.status, "active");
        assert_eq!(enrollment.progress, 0.0);
        assert_matches!(
            svc.enroll("u1", "course-404").await,
            Err(AcademyError::NotFound { entity: "course", .. })
        );
    }

    #[test]
    fn percentage_handles_empty_and_overflowing_counts() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(3, 6), 50.0);
        assert_eq!(percentage(7, 6), 100.0);
        assert!((percentage(1, 3) - 33.333).abs() < 0.01);
    }

    /// Catalog whose single course can grow between calls.
    struct GrowingCatalog {
        course: RwLock<Course>,
    }

    #[async_trait]
    impl CatalogSource for GrowingCatalog {
        async fn courses(&self) -> AcademyResult<Vec<Course>> {
            Ok(vec![self.course.read().await.clone()])
        }

        async fn course(&self, course_id: &str) -> AcademyResult<Option<Course>> {
            let course = self.course.read().await;
            Ok((course.id == course_id).then(|| course.clone()))
        }
    }

    fn lesson(id: &str) -> Lesson {
        Lesson {
            id: id.into(),
            title: id.into(),
            duration_secs: 100,
            video_id: format!("video-{id}"),
            resources: Vec::new(),
        }
    }

    #[tokio::test]
    async fn denominator_follows_current_course_structure() {
        let base = StaticCatalog::bundled(Latency::NONE).unwrap();
        let mut course = base.course("course-004").await.unwrap().unwrap();
        course.modules = vec![Module {
            id: "m1".into(),
            title: "m1".into(),
            description: String::new(),
            lessons: vec![lesson("a"), lesson("b")],
        }];
        let catalog = Arc::new(GrowingCatalog { course: RwLock::new(course) });
        let store = Arc::new(KvProgressStore::new(Arc::new(MemoryKeyValueStore::new())));
        let svc = ProgressService::new(catalog.clone(), store, Latency::NONE);

        let p = svc.record_lesson_event("u1", "course-004", "a", watched(100.0)).await.unwrap();
        assert_eq!(p.overall_progress, 50.0);

        catalog.course.write().await.modules[0].lessons.extend([lesson("c"), lesson("d")]);

        let p = svc.record_lesson_event("u1", "course-004", "c", watched(100.0)).await.unwrap();
        assert_eq!(p.overall_progress, 50.0);
        assert_eq!(p.module_progress[0].lesson_progress.len(), 4);
        assert!(!p.module_progress[0].completed);
    }

    #[tokio::test]
    async fn grown_module_is_incomplete_until_new_lesson_is_watched() {
        let base = StaticCatalog::bundled(Latency::NONE).unwrap();
        let mut course = base.course("course-004").await.unwrap().unwrap();
        course.modules = vec![
            Module {
                id: "m1".into(),
                title: "m1".into(),
                description: String::new(),
                lessons: vec![lesson("a"), lesson("b")],
            },
            Module {
                id: "m2".into(),
                title: "m2".into(),
                description: String::new(),
                lessons: vec![lesson("x")],
            },
        ];
        let catalog = Arc::new(GrowingCatalog { course: RwLock::new(course) });
        let store = Arc::new(KvProgressStore::new(Arc::new(MemoryKeyValueStore::new())));
        let svc = ProgressService::new(catalog.clone(), store, Latency::NONE);

        svc.record_lesson_event("u1", "course-004", "a", watched(100.0)).await.unwrap();
        let p = svc.record_lesson_event("u1", "course-004", "b", watched(100.0)).await.unwrap();
        assert!(p.module_progress[0].completed);

        catalog.course.write().await.modules[0].lessons.push(lesson("c"));

        let p = svc.record_lesson_event("u1", "course-004", "x", watched(100.0)).await.unwrap();
        assert_eq!(p.overall_progress, 75.0);
        assert!(!p.module_progress[0].completed);
        assert!(p.module_progress[1].completed);
        assert_eq!(p.module_progress[0].lesson_progress.len(), 3);
        assert_eq!(p.lesson("c").map(|l| l.completed), Some(false));
    }
}
