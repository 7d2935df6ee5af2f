//! COCO class labels and the delivery-cue subset.

/// The 80 COCO class names, indexed by YOLOv8 class id.
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck",
    "boat", "traffic light", "fire hydrant", "stop sign", "parking meter", "bench",
    "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra",
    "giraffe", "backpack", "umbrella", "handbag", "tie", "suitcase", "frisbee",
    "skis", "snowboard", "sports ball", "kite", "baseball bat", "baseball glove",
    "skateboard", "surfboard", "tennis racket", "bottle", "wine glass", "cup",
    "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink",
    "refrigerator", "book", "clock", "vase", "scissors", "teddy bear", "hair drier",
    "toothbrush",
];

/// Class id of "person" in COCO.
pub const PERSON_CLASS_ID: usize = 0;

/// Labels treated as a heuristic proxy for a delivery worker when no face
/// matches the gallery.
pub const DELIVERY_CUES: &[&str] = &["handbag", "backpack", "helmet", "suit", "hat"];

/// Look up a class name by id. Out-of-range ids map to "unknown".
pub fn class_name(class_id: usize) -> &'static str {
    COCO_CLASSES.get(class_id).copied().unwrap_or("unknown")
}

/// Whether a label belongs to the delivery-cue set.
pub fn is_delivery_cue(label: &str) -> bool {
    DELIVERY_CUES.contains(&label)
}
