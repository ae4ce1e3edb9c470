pub mod shared {
    pub mod constants;
    pub mod face_box;
    pub mod frame;
    pub mod settings;
}

pub mod detection {
    pub mod domain {
        pub mod face_detector;
        pub mod frame_source;
    }
    pub mod infrastructure;
}

pub mod monitoring {
    pub mod domain {
        pub mod stats_aggregator;
        pub mod throttle_gate;
        pub mod tracker_state;
        pub mod violation;
        pub mod violation_classifier;
    }
    pub mod detection_loop;
    pub mod monitor_logger;
    pub mod monitoring_engine;
}
