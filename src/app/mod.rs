// Application layer - Use case interactors

pub mod container;
pub mod inspect_interactor;
pub mod montage_interactor;

// Re-export interactors
pub use inspect_interactor::{InspectInteractor, InspectReport};
pub use montage_interactor::{
    MontageInteractor, MontageReport, MontageRequest, MontageRun, MontageState, PlanPreview, PreparedMontage,
};
