//! Latent-ability (IRT) estimation: logistic response functions, MLE
//! and EAP theta estimators, information-driven item selection, and EM
//! item-parameter calibration.

pub mod calibrate;
pub mod estimate;
pub mod irt;
pub mod select;

pub use calibrate::{
    calibrate_items, CalibrationDecline, CalibrationOutcome, ItemCalibration, ResponseMatrix,
};
pub use estimate::{estimate_theta_eap, estimate_theta_mle, EstimationMethod, ThetaEstimate};
pub use irt::{
    fisher_information, probability, probability_1pl, probability_2pl, probability_3pl,
    ItemParameters,
};
pub use select::{select_item_kl, select_next_item};
