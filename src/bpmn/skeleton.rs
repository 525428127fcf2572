//! Skeleton diagram builder
//!
//! Lays out a start event, a left-to-right chain of user tasks and an end event
//! as Flowable-flavoured BPMN 2.0 XML, including diagram coordinates.

use serde::Serialize;

use super::segment::slugify;
use super::{
    XmlError, BPMN_DI_NS, BPMN_MODEL_NS, DC_NS, DI_NS, FLOWABLE_NS, FLOWABLE_TARGET_NS, XSI_NS,
};

/// Name of the process shown when the modeler starts or is reset
pub const STARTER_PROCESS_NAME: &str = "New Flowable Process";

/// Tasks used when no steps could be extracted
pub const DEFAULT_TASKS: [&str; 3] = ["Review request", "Approve request", "Notify requester"];

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

const START_EVENT_ID: &str = "StartEvent_1";
const END_EVENT_ID: &str = "EndEvent_1";

// Layout, in diagram units
const START_EVENT_X: i32 = 150;
const EVENT_Y: i32 = 152;
const EVENT_SIZE: i32 = 36;
const FIRST_TASK_X: i32 = 240;
const TASK_Y: i32 = 130;
const TASK_WIDTH: i32 = 120;
const TASK_HEIGHT: i32 = 80;
const TASK_SPACING: i32 = 170;
const END_EVENT_GAP: i32 = 20;
const FLOW_Y: i32 = 170;

// ============================================================================
// XML shape of the generated document
// ============================================================================

#[derive(Debug, Serialize)]
struct Definitions {
    #[serde(rename = "@xmlns:xsi")]
    xmlns_xsi: &'static str,
    #[serde(rename = "@xmlns:bpmn")]
    xmlns_bpmn: &'static str,
    #[serde(rename = "@xmlns:bpmndi")]
    xmlns_bpmndi: &'static str,
    #[serde(rename = "@xmlns:dc")]
    xmlns_dc: &'static str,
    #[serde(rename = "@xmlns:di")]
    xmlns_di: &'static str,
    #[serde(rename = "@xmlns:flowable")]
    xmlns_flowable: &'static str,
    #[serde(rename = "@id")]
    id: &'static str,
    #[serde(rename = "@targetNamespace")]
    target_namespace: &'static str,
    #[serde(rename = "bpmn:process")]
    process: Process,
    #[serde(rename = "bpmndi:BPMNDiagram")]
    diagram: Diagram,
}

#[derive(Debug, Serialize)]
struct Process {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@isExecutable")]
    is_executable: bool,
    #[serde(rename = "bpmn:startEvent")]
    start_event: FlowNode,
    #[serde(rename = "bpmn:userTask")]
    tasks: Vec<FlowNode>,
    #[serde(rename = "bpmn:endEvent")]
    end_event: FlowNode,
    #[serde(rename = "bpmn:sequenceFlow")]
    flows: Vec<SequenceFlow>,
}

#[derive(Debug, Serialize)]
struct FlowNode {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@name")]
    name: String,
}

#[derive(Debug, Serialize)]
struct SequenceFlow {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@sourceRef")]
    source: String,
    #[serde(rename = "@targetRef")]
    target: String,
}

#[derive(Debug, Serialize)]
struct Diagram {
    #[serde(rename = "@id")]
    id: &'static str,
    #[serde(rename = "bpmndi:BPMNPlane")]
    plane: Plane,
}

#[derive(Debug, Serialize)]
struct Plane {
    #[serde(rename = "@id")]
    id: &'static str,
    #[serde(rename = "@bpmnElement")]
    element: String,
    #[serde(rename = "bpmndi:BPMNShape")]
    shapes: Vec<Shape>,
    #[serde(rename = "bpmndi:BPMNEdge")]
    edges: Vec<Edge>,
}

#[derive(Debug, Serialize)]
struct Shape {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@bpmnElement")]
    element: String,
    #[serde(rename = "dc:Bounds")]
    bounds: Bounds,
}

#[derive(Debug, Serialize)]
struct Bounds {
    #[serde(rename = "@x")]
    x: i32,
    #[serde(rename = "@y")]
    y: i32,
    #[serde(rename = "@width")]
    width: i32,
    #[serde(rename = "@height")]
    height: i32,
}

#[derive(Debug, Serialize)]
struct Edge {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@bpmnElement")]
    element: String,
    #[serde(rename = "di:waypoint")]
    waypoints: Vec<Waypoint>,
}

#[derive(Debug, Serialize)]
struct Waypoint {
    #[serde(rename = "@x")]
    x: i32,
    #[serde(rename = "@y")]
    y: i32,
}

// ============================================================================
// Layout
// ============================================================================

fn task_x(index: usize) -> i32 {
    FIRST_TASK_X + TASK_SPACING * index as i32
}

fn end_event_x(task_count: usize) -> i32 {
    task_x(task_count) + END_EVENT_GAP
}

/// Horizontal extent of the `index`-th flow in a chain of `task_count` tasks
fn flow_span(index: usize, task_count: usize) -> (i32, i32) {
    let start = if index == 0 {
        START_EVENT_X + EVENT_SIZE
    } else {
        task_x(index - 1) + TASK_WIDTH
    };
    let end = if index == task_count {
        end_event_x(task_count)
    } else {
        task_x(index)
    };
    (start, end)
}

fn sequence_flows(task_ids: &[String]) -> Vec<SequenceFlow> {
    let mut flows = Vec::with_capacity(task_ids.len() + 1);
    flows.push(SequenceFlow {
        id: "Flow_start_1".to_string(),
        source: START_EVENT_ID.to_string(),
        target: task_ids[0].clone(),
    });
    for (index, pair) in task_ids.windows(2).enumerate() {
        flows.push(SequenceFlow {
            id: format!("Flow_{}", index + 1),
            source: pair[0].clone(),
            target: pair[1].clone(),
        });
    }
    flows.push(SequenceFlow {
        id: "Flow_end_1".to_string(),
        source: task_ids[task_ids.len() - 1].clone(),
        target: END_EVENT_ID.to_string(),
    });
    flows
}

fn event_shape(id: &str, x: i32) -> Shape {
    Shape {
        id: format!("{}_di", id),
        element: id.to_string(),
        bounds: Bounds {
            x,
            y: EVENT_Y,
            width: EVENT_SIZE,
            height: EVENT_SIZE,
        },
    }
}

/// Build a linear process `start -> tasks... -> end` as BPMN XML
///
/// Falls back to [`DEFAULT_TASKS`] when `task_names` is empty. The document
/// always holds exactly one more sequence flow than it holds tasks.
pub fn create_skeleton_xml<S: AsRef<str>>(
    process_name: &str,
    task_names: &[S],
) -> Result<String, XmlError> {
    let names: Vec<&str> = if task_names.is_empty() {
        DEFAULT_TASKS.to_vec()
    } else {
        task_names.iter().map(|name| name.as_ref()).collect()
    };
    let process_id = format!("process_{}", slugify(process_name));

    let tasks: Vec<FlowNode> = names
        .iter()
        .enumerate()
        .map(|(index, name)| FlowNode {
            id: format!("Task_{}", index + 1),
            name: name.to_string(),
        })
        .collect();
    let task_ids: Vec<String> = tasks.iter().map(|task| task.id.clone()).collect();
    let flows = sequence_flows(&task_ids);

    let mut shapes = Vec::with_capacity(tasks.len() + 2);
    shapes.push(event_shape(START_EVENT_ID, START_EVENT_X));
    for (index, id) in task_ids.iter().enumerate() {
        shapes.push(Shape {
            id: format!("{}_di", id),
            element: id.clone(),
            bounds: Bounds {
                x: task_x(index),
                y: TASK_Y,
                width: TASK_WIDTH,
                height: TASK_HEIGHT,
            },
        });
    }
    shapes.push(event_shape(END_EVENT_ID, end_event_x(tasks.len())));

    let edges = flows
        .iter()
        .enumerate()
        .map(|(index, flow)| {
            let (start, end) = flow_span(index, tasks.len());
            Edge {
                id: format!("{}_di", flow.id),
                element: flow.id.clone(),
                waypoints: vec![
                    Waypoint { x: start, y: FLOW_Y },
                    Waypoint { x: end, y: FLOW_Y },
                ],
            }
        })
        .collect();

    let definitions = Definitions {
        xmlns_xsi: XSI_NS,
        xmlns_bpmn: BPMN_MODEL_NS,
        xmlns_bpmndi: BPMN_DI_NS,
        xmlns_dc: DC_NS,
        xmlns_di: DI_NS,
        xmlns_flowable: FLOWABLE_NS,
        id: "Definitions_1",
        target_namespace: FLOWABLE_TARGET_NS,
        process: Process {
            id: process_id.clone(),
            name: process_name.to_string(),
            is_executable: true,
            start_event: FlowNode {
                id: START_EVENT_ID.to_string(),
                name: "Start".to_string(),
            },
            tasks,
            end_event: FlowNode {
                id: END_EVENT_ID.to_string(),
                name: "End".to_string(),
            },
            flows,
        },
        diagram: Diagram {
            id: "BPMNDiagram_1",
            plane: Plane {
                id: "BPMNPlane_1",
                element: process_id,
                shapes,
                edges,
            },
        },
    };

    let mut xml = String::from(XML_DECLARATION);
    xml.push('\n');
    let mut serializer = quick_xml::se::Serializer::with_root(&mut xml, Some("bpmn:definitions"))
        .map_err(|e| XmlError::Write(e.to_string()))?;
    serializer.indent(' ', 2);
    definitions
        .serialize(serializer)
        .map_err(|e| XmlError::Write(e.to_string()))?;

    Ok(xml)
}
