//! Per-language base images.
//!
//! Base images carry the fuzzing toolchain for one language and are shared by
//! every project of that language. They are tagged `base_image_<language>` and
//! built from `<tag>.Dockerfile` in the base images directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::error::{ManagerError, MissingPath};
use crate::execution::ContainerEngine;
use crate::project::Language;

/// Default name of the directory holding base image Dockerfiles.
pub const BASE_IMAGES_DIR: &str = "base_images";

/// Checks whether the base image for `language` exists in the engine.
///
/// Always asks the engine: another invocation may build or delete the image
/// between two checks. A lookup the daemon could not answer is an
/// `EngineApi` failure, not a missing image.
pub async fn base_image_ready(
    engine: &dyn ContainerEngine,
    language: Language,
) -> Result<bool, ManagerError> {
    let image = language.base_image_name();
    engine.try_image_exists(&image).await.map_err(|e| {
        error!(base_image = %image, error = %e, "Base image lookup failed");
        ManagerError::from_engine(e)
    })
}

/// Dockerfile name for a language's base image, e.g. `base_image_go.Dockerfile`.
pub fn base_image_dockerfile(language: Language) -> String {
    format!("{}.Dockerfile", language.base_image_name())
}

/// Builds and queries base images.
pub struct BaseImageRegistry {
    engine: Arc<dyn ContainerEngine>,
    base_images_dir: PathBuf,
}

impl BaseImageRegistry {
    pub fn new(engine: Arc<dyn ContainerEngine>, base_images_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            base_images_dir: base_images_dir.into(),
        }
    }

    pub fn base_images_dir(&self) -> &Path {
        &self.base_images_dir
    }

    pub async fn base_image_ready(&self, language: Language) -> Result<bool, ManagerError> {
        base_image_ready(self.engine.as_ref(), language).await
    }

    /// Builds the base image of every language, or only of `only`.
    ///
    /// Stops at the first failing build; images built before it are kept.
    /// Returns the languages whose images were built.
    #[instrument(skip(self), fields(dir = %self.base_images_dir.display()))]
    pub async fn build_base_images(
        &self,
        only: Option<Language>,
    ) -> Result<Vec<Language>, ManagerError> {
        if !self.base_images_dir.is_dir() {
            error!("Base images directory does not exist");
            return Err(ManagerError::PathNotFound {
                what: MissingPath::BaseImagesDir,
                path: self.base_images_dir.clone(),
            });
        }

        info!("Building base images...");
        let mut built = Vec::new();
        for language in Language::ALL
            .into_iter()
            .filter(|l| only.map_or(true, |o| o == *l))
        {
            let image = language.base_image_name();
            let dockerfile = base_image_dockerfile(language);
            info!(image = %image, dockerfile = %dockerfile, "Building base image");

            if let Err(e) = self
                .engine
                .build_image(&image, &self.base_images_dir, &dockerfile)
                .await
            {
                error!(image = %image, error = %e, "Docker build failed");
                return Err(ManagerError::from_build(&image, e));
            }
            built.push(language);
        }

        info!(count = built.len(), "Base images built successfully");
        Ok(built)
    }
}
