pub mod deadline_face_detector;
pub mod recorded_trace;
pub mod trace_face_detector;
pub mod trace_frame_source;
