//! Course catalog: static course data plus filtering and resource listing.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AcademyError, AcademyResult};
use crate::models::{Course, CourseResource};
use crate::store::{CatalogSource, Latency};

const BUNDLED_CATALOG: &str = include_str!("../data/catalog.json");

/// Optional, conjunctive course filter.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct CourseFilter {
    pub category: Option<String>,
    pub level: Option<String>,
    pub featured: Option<bool>,
    pub search: Option<String>,
}

impl CourseFilter {
    pub fn matches(&self, course: &Course) -> bool {
        if let Some(category) = &self.category {
            if &course.category != category {
                return false;
            }
        }
        if let Some(level) = &self.level {
            if &course.level != level {
                return false;
            }
        }
        if let Some(featured) = self.featured {
            if course.featured != featured {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => matches_search(course, &term.to_lowercase()),
            _ => true,
        }
    }
}

// `term` must already be lowercased
fn matches_search(course: &Course, term: &str) -> bool {
    course.title.to_lowercase().contains(term)
        || course.description.to_lowercase().contains(term)
        || course.tags.iter().any(|t| t.to_lowercase().contains(term))
}

/// Catalog held entirely in memory, in insertion order.
pub struct StaticCatalog {
    courses: Vec<Course>,
    latency: Latency,
}

impl StaticCatalog {
    pub fn new(courses: Vec<Course>, latency: Latency) -> Self {
        Self { courses, latency }
    }

    pub fn from_json(json: &str, latency: Latency) -> AcademyResult<Self> {
        let courses: Vec<Course> = serde_json::from_str(json)?;
        Ok(Self::new(courses, latency))
    }

    pub fn bundled(latency: Latency) -> AcademyResult<Self> {
        Self::from_json(BUNDLED_CATALOG, latency)
    }

    pub async fn from_path(path: &Path, latency: Latency) -> anyhow::Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        let catalog = Self::from_json(&json, latency)?;
        tracing::info!(path = %path.display(), courses = catalog.courses.len(), "loaded catalog");
        Ok(catalog)
    }
}

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn courses(&self) -> AcademyResult<Vec<Course>> {
        self.latency.simulate().await;
        Ok(self.courses.clone())
    }

    async fn course(&self, course_id: &str) -> AcademyResult<Option<Course>> {
        self.latency.simulate().await;
        Ok(self.courses.iter().find(|c| c.id == course_id).cloned())
    }
}

#[derive(Clone)]
pub struct CatalogService {
    source: Arc<dyn CatalogSource>,
}

impl CatalogService {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self { source }
    }

    pub async fn list_courses(&self, filter: &CourseFilter) -> AcademyResult<Vec<Course>> {
        let courses = self.source.courses().await?;
        Ok(courses.into_iter().filter(|c| filter.matches(c)).collect())
    }

    pub async fn course_details(&self, course_id: &str) -> AcademyResult<Course> {
        self.source
            .course(course_id)
            .await?
            .ok_or_else(|| AcademyError::not_found("course", course_id))
    }

    /// Every lesson resource of a course, in lesson order.
    pub async fn course_resources(&self, course_id: &str) -> AcademyResult<Vec<CourseResource>> {
        let course = self.course_details(course_id).await?;
        let resources = course
            .modules
            .iter()
            .flat_map(|m| {
                m.lessons.iter().flat_map(move |l| {
                    l.resources.iter().map(move |r| CourseResource {
                        module_id: m.id.clone(),
                        lesson_id: l.id.clone(),
                        resource: r.clone(),
                    })
                })
            })
            .collect();
        Ok(resources)
    }
}
