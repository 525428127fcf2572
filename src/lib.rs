//! Flowable AI Modeler Library
//!
//! Core library for the flowable-modeler tool: turns free-text process
//! descriptions into Flowable-ready BPMN 2.0 diagrams.

pub mod app;
pub mod bpmn;
pub mod generation;
pub mod storage;
pub mod types;
