use crate::element::{Element, NodeChild};
use crate::pattern;

/// 候选节点：金额所在的最具体容器
#[derive(Debug, Clone)]
pub struct Candidate {
    /// 从扫描根到该元素的子节点索引路径
    pub path: Vec<usize>,
    /// 该元素可见文本中的金额出现次数
    pub occurrences: usize,
}

/// 按文档顺序查找包含金额的候选节点
///
/// 遍历 `root` 的全部后代元素（前序，不含 `root` 自身），最多返回
/// `limit` 个候选（None 表示不限制）。
///
/// 父子裁决：当紧邻的上一个候选是当前元素的父节点时——
/// - 次数相等：父节点是冗余的外层容器，丢弃父节点保留子节点；
/// - 父节点次数更多：子节点只是大块中的局部，跳过该子节点及其整棵子树。
pub fn find(root: &Element, limit: Option<usize>) -> Vec<Candidate> {
    let mut accepted = Vec::new();
    let mut path = Vec::new();
    visit_children(root, &mut path, limit, &mut accepted);
    accepted
}

/// 递归访问子元素，返回 false 表示已达上限、整体终止遍历
fn visit_children(
    parent: &Element,
    path: &mut Vec<usize>,
    limit: Option<usize>,
    accepted: &mut Vec<Candidate>,
) -> bool {
    for (index, child) in parent.children.iter().enumerate() {
        let NodeChild::Element(element) = child else {
            continue;
        };

        path.push(index);
        let keep_going = visit_element(element, path, limit, accepted);
        path.pop();

        if !keep_going {
            return false;
        }
    }
    true
}

fn visit_element(
    element: &Element,
    path: &mut Vec<usize>,
    limit: Option<usize>,
    accepted: &mut Vec<Candidate>,
) -> bool {
    let occurrences = pattern::count_amounts(&element.text());
    if occurrences == 0 {
        // 后代文本是当前文本的子串，不可能再出现金额
        return true;
    }

    if let Some(last) = accepted.last() {
        if is_parent_of(&last.path, path) {
            if last.occurrences == occurrences {
                // 子节点是更具体的容器，替换掉父节点
                accepted.pop();
                accepted.push(Candidate {
                    path: path.clone(),
                    occurrences,
                });
                return visit_children(element, path, limit, accepted);
            }
            // 父节点覆盖更多金额，跳过该子树
            return true;
        }
    }

    if let Some(limit) = limit {
        if accepted.len() >= limit {
            return false;
        }
    }

    accepted.push(Candidate {
        path: path.clone(),
        occurrences,
    });
    visit_children(element, path, limit, accepted)
}

/// `parent` 是否恰为 `child` 的直接父路径
fn is_parent_of(parent: &[usize], child: &[usize]) -> bool {
    child.len() == parent.len() + 1 && child.starts_with(parent)
}
