//! BPMN document import and export
//!
//! Importing patches the XML for Flowable, parses the process structure out of
//! it and collects the same kind of warnings a diagram modeler reports on
//! import. Exporting re-indents the XML for a `.bpmn` file.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use serde::Deserialize;
use thiserror::Error;

use super::compliance::ensure_flowable_compliance;
use super::XmlError;

/// Import errors
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Xml(#[from] XmlError),
    #[error("Expected a BPMN definitions document, found <{0}>")]
    NotDefinitions(String),
    #[error("Failed to read BPMN structure: {0}")]
    Parse(String),
    #[error("No process found in BPMN document")]
    NoProcess,
}

// ============================================================================
// XML shape, only the parts we summarize
// ============================================================================

/// Flow nodes only need an ID and an optional name
#[derive(Debug, Deserialize)]
struct NodeXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@name", default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SequenceFlowXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@sourceRef")]
    source: String,
    #[serde(rename = "@targetRef")]
    target: String,
}

#[derive(Debug, Deserialize)]
struct ProcessXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@name", default)]
    name: Option<String>,
    #[serde(rename = "@isExecutable", default)]
    is_executable: Option<String>,
    #[serde(rename = "startEvent", default)]
    start_events: Vec<NodeXml>,
    #[serde(rename = "endEvent", default)]
    end_events: Vec<NodeXml>,
    #[serde(rename = "intermediateCatchEvent", default)]
    catch_events: Vec<NodeXml>,
    #[serde(rename = "intermediateThrowEvent", default)]
    throw_events: Vec<NodeXml>,
    #[serde(rename = "boundaryEvent", default)]
    boundary_events: Vec<NodeXml>,
    #[serde(rename = "task", default)]
    tasks: Vec<NodeXml>,
    #[serde(rename = "userTask", default)]
    user_tasks: Vec<NodeXml>,
    #[serde(rename = "serviceTask", default)]
    service_tasks: Vec<NodeXml>,
    #[serde(rename = "scriptTask", default)]
    script_tasks: Vec<NodeXml>,
    #[serde(rename = "sendTask", default)]
    send_tasks: Vec<NodeXml>,
    #[serde(rename = "receiveTask", default)]
    receive_tasks: Vec<NodeXml>,
    #[serde(rename = "manualTask", default)]
    manual_tasks: Vec<NodeXml>,
    #[serde(rename = "businessRuleTask", default)]
    business_rule_tasks: Vec<NodeXml>,
    #[serde(rename = "subProcess", default)]
    sub_processes: Vec<NodeXml>,
    #[serde(rename = "callActivity", default)]
    call_activities: Vec<NodeXml>,
    #[serde(rename = "exclusiveGateway", default)]
    exclusive_gateways: Vec<NodeXml>,
    #[serde(rename = "parallelGateway", default)]
    parallel_gateways: Vec<NodeXml>,
    #[serde(rename = "inclusiveGateway", default)]
    inclusive_gateways: Vec<NodeXml>,
    #[serde(rename = "eventBasedGateway", default)]
    event_based_gateways: Vec<NodeXml>,
    #[serde(rename = "sequenceFlow", default)]
    sequence_flows: Vec<SequenceFlowXml>,
}

#[derive(Debug, Deserialize)]
struct DiagramElementXml {
    #[serde(rename = "@bpmnElement", default)]
    element: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaneXml {
    #[serde(rename = "BPMNShape", default)]
    shapes: Vec<DiagramElementXml>,
    #[serde(rename = "BPMNEdge", default)]
    edges: Vec<DiagramElementXml>,
}

#[derive(Debug, Deserialize)]
struct DiagramXml {
    #[serde(rename = "BPMNPlane", default)]
    planes: Vec<PlaneXml>,
}

/// The document element of a BPMN 2.0 file
#[derive(Debug, Deserialize)]
struct DefinitionsXml {
    #[serde(rename = "@id", default)]
    id: Option<String>,
    #[serde(rename = "@targetNamespace", default)]
    target_namespace: Option<String>,
    #[serde(rename = "process", default)]
    processes: Vec<ProcessXml>,
    #[serde(rename = "BPMNDiagram", default)]
    diagrams: Vec<DiagramXml>,
}

// ============================================================================
// Summary model
// ============================================================================

/// Kinds of flow nodes recognised on import
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    StartEvent,
    EndEvent,
    IntermediateEvent,
    BoundaryEvent,
    Task,
    UserTask,
    ServiceTask,
    ScriptTask,
    SendTask,
    ReceiveTask,
    ManualTask,
    BusinessRuleTask,
    SubProcess,
    CallActivity,
    ExclusiveGateway,
    ParallelGateway,
    InclusiveGateway,
    EventBasedGateway,
}

impl ElementKind {
    pub fn is_task(&self) -> bool {
        matches!(
            self,
            ElementKind::Task
                | ElementKind::UserTask
                | ElementKind::ServiceTask
                | ElementKind::ScriptTask
                | ElementKind::SendTask
                | ElementKind::ReceiveTask
                | ElementKind::ManualTask
                | ElementKind::BusinessRuleTask
        )
    }

    pub fn is_gateway(&self) -> bool {
        matches!(
            self,
            ElementKind::ExclusiveGateway
                | ElementKind::ParallelGateway
                | ElementKind::InclusiveGateway
                | ElementKind::EventBasedGateway
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowElement {
    pub id: String,
    pub name: Option<String>,
    pub kind: ElementKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flow {
    pub id: String,
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSummary {
    pub id: String,
    pub name: Option<String>,
    pub is_executable: bool,
    pub elements: Vec<FlowElement>,
    pub flows: Vec<Flow>,
}

impl ProcessSummary {
    pub fn task_count(&self) -> usize {
        self.elements.iter().filter(|e| e.kind.is_task()).count()
    }

    pub fn gateway_count(&self) -> usize {
        self.elements.iter().filter(|e| e.kind.is_gateway()).count()
    }

    pub fn count_of(&self, kind: ElementKind) -> usize {
        self.elements.iter().filter(|e| e.kind == kind).count()
    }
}

/// What a BPMN document contains, as far as this tool cares
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BpmnDocument {
    pub id: Option<String>,
    pub target_namespace: Option<String>,
    pub processes: Vec<ProcessSummary>,
}

/// Non-fatal problems found while importing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportWarning {
    UnresolvedReference { flow: String, reference: String },
    MissingShape { element: String },
    MissingStartEvent { process: String },
    NoDiagram,
}

impl Display for ImportWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportWarning::UnresolvedReference { flow, reference } => {
                write!(f, "sequence flow {} references unknown element {}", flow, reference)
            }
            ImportWarning::MissingShape { element } => {
                write!(f, "element {} has no diagram shape", element)
            }
            ImportWarning::MissingStartEvent { process } => {
                write!(f, "process {} has no start event", process)
            }
            ImportWarning::NoDiagram => write!(f, "document has no diagram coordinates"),
        }
    }
}

/// A Flowable-compliant diagram ready to be stored or exported
#[derive(Debug, Clone)]
pub struct ImportedDiagram {
    pub xml: String,
    pub document: BpmnDocument,
    pub warnings: Vec<ImportWarning>,
}

impl From<ProcessXml> for ProcessSummary {
    fn from(process: ProcessXml) -> Self {
        macro_rules! collect {
            ($source:ident, $elements:ident, $($field:ident => $kind:expr),* $(,)?) => {$(
                for node in $source.$field {
                    $elements.push(FlowElement { id: node.id, name: node.name, kind: $kind });
                }
            )*};
        }

        let mut elements = Vec::new();
        collect!(process, elements,
            start_events => ElementKind::StartEvent,
            catch_events => ElementKind::IntermediateEvent,
            throw_events => ElementKind::IntermediateEvent,
            boundary_events => ElementKind::BoundaryEvent,
            tasks => ElementKind::Task,
            user_tasks => ElementKind::UserTask,
            service_tasks => ElementKind::ServiceTask,
            script_tasks => ElementKind::ScriptTask,
            send_tasks => ElementKind::SendTask,
            receive_tasks => ElementKind::ReceiveTask,
            manual_tasks => ElementKind::ManualTask,
            business_rule_tasks => ElementKind::BusinessRuleTask,
            sub_processes => ElementKind::SubProcess,
            call_activities => ElementKind::CallActivity,
            exclusive_gateways => ElementKind::ExclusiveGateway,
            parallel_gateways => ElementKind::ParallelGateway,
            inclusive_gateways => ElementKind::InclusiveGateway,
            event_based_gateways => ElementKind::EventBasedGateway,
            end_events => ElementKind::EndEvent,
        );

        let flows = process
            .sequence_flows
            .into_iter()
            .map(|flow| Flow {
                id: flow.id,
                source: flow.source,
                target: flow.target,
            })
            .collect();

        ProcessSummary {
            id: process.id,
            name: process.name,
            is_executable: process.is_executable.as_deref() == Some("true"),
            elements,
            flows,
        }
    }
}

/// Local name of the document element, if there is one
fn root_local_name(xml: &str) -> Result<Option<String>, XmlError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader
            .read_event()
            .map_err(|e| XmlError::Malformed(e.to_string()))?
        {
            Event::Start(e) | Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                return Ok(Some(name));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

fn collect_warnings(diagrams: &[DiagramXml], processes: &[ProcessSummary]) -> Vec<ImportWarning> {
    let mut warnings = Vec::new();

    let drawn: HashSet<&str> = diagrams
        .iter()
        .flat_map(|diagram| diagram.planes.iter())
        .flat_map(|plane| plane.shapes.iter().chain(plane.edges.iter()))
        .filter_map(|element| element.element.as_deref())
        .collect();
    if drawn.is_empty() {
        warnings.push(ImportWarning::NoDiagram);
    }

    for process in processes {
        if process.count_of(ElementKind::StartEvent) == 0 {
            warnings.push(ImportWarning::MissingStartEvent {
                process: process.id.clone(),
            });
        }

        let known: HashSet<&str> = process.elements.iter().map(|e| e.id.as_str()).collect();
        for flow in &process.flows {
            for reference in [&flow.source, &flow.target] {
                if !known.contains(reference.as_str()) {
                    warnings.push(ImportWarning::UnresolvedReference {
                        flow: flow.id.clone(),
                        reference: reference.clone(),
                    });
                }
            }
        }

        if !drawn.is_empty() {
            let undrawn = process
                .elements
                .iter()
                .map(|e| &e.id)
                .chain(process.flows.iter().map(|f| &f.id))
                .filter(|id| !drawn.contains(id.as_str()));
            for id in undrawn {
                warnings.push(ImportWarning::MissingShape { element: id.clone() });
            }
        }
    }

    warnings
}

/// Patch, parse and check a BPMN document
pub fn import_xml(xml: &str) -> Result<ImportedDiagram, ImportError> {
    let xml = ensure_flowable_compliance(xml).map_err(|e| {
        tracing::warn!("Rejected BPMN XML: {}", e.detail());
        e
    })?;

    match root_local_name(&xml)? {
        Some(name) if name == "definitions" => {}
        Some(name) => return Err(ImportError::NotDefinitions(name)),
        None => return Err(ImportError::NoProcess),
    }

    let definitions: DefinitionsXml =
        quick_xml::de::from_str(&xml).map_err(|e| ImportError::Parse(e.to_string()))?;
    if definitions.processes.is_empty() {
        return Err(ImportError::NoProcess);
    }

    let DefinitionsXml {
        id,
        target_namespace,
        processes,
        diagrams,
    } = definitions;
    let processes: Vec<ProcessSummary> = processes.into_iter().map(ProcessSummary::from).collect();

    let warnings = collect_warnings(&diagrams, &processes);
    for warning in &warnings {
        tracing::warn!("BPMN import: {}", warning);
    }

    Ok(ImportedDiagram {
        xml,
        document: BpmnDocument {
            id,
            target_namespace,
            processes,
        },
        warnings,
    })
}

/// Re-indent XML with two spaces, as written to exported `.bpmn` files
pub fn format_xml(xml: &str) -> Result<String, XmlError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut writer = Writer::new_with_indent(Vec::with_capacity(xml.len()), b' ', 2);

    loop {
        match reader
            .read_event()
            .map_err(|e| XmlError::Malformed(e.to_string()))?
        {
            Event::Eof => break,
            event => writer
                .write_event(event)
                .map_err(|e| XmlError::Write(e.to_string()))?,
        }
    }

    String::from_utf8(writer.into_inner()).map_err(|e| XmlError::Write(e.to_string()))
}
