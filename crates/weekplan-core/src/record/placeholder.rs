//! The record a fresh session starts from, before any generation.

use super::{
    CollectiveActivity, ContentSegment, DailyPlan, RoutineSegment, TitledSegment,
    WeeklyInfo, WeeklyPlanRecord,
};

/// Sample one-day record shown before the first generation.
pub fn placeholder_record() -> WeeklyPlanRecord {
    WeeklyPlanRecord {
        weekly_info: WeeklyInfo {
            date_range: "2025.10.13 - 2025.10.17".to_string(),
            theme: "《美味秋天》".to_string(),
            class_str: "中（2）班".to_string(),
            teachers: "丁瑶薇、刘舸".to_string(),
        },
        daily_plans: vec![DailyPlan {
            day: "周一".to_string(),
            date: "2025.10.13".to_string(),
            morning_exercise: RoutineSegment {
                activity: "1. 自主签到：选择运动手环。\n2. 体锻活动（安吉梯组合）：尝试合作搭建，在不同坡度梯面上行走。\n3. 放松活动：互相拍打肌肉。".to_string(),
                observation: "1. 观察搭建稳固性。\n2. 观察走独木桥时的平衡注视。\n3. 观察克服恐惧的情况。".to_string(),
                reflection: "★85%幼儿平衡能力良好，能发现固定梯子的方法。\n▲约15%女生不敢尝试高梯。\n◎明设“分级挑战区”，从低难度引导自信。".to_string(),
            },
            area_play: RoutineSegment {
                activity: "1. 美工区：树叶拼贴画，创意拼贴。\n2. 建构区：搭建秋天公园，围合围墙。\n3. 重点指导：利用自然纹理创作。".to_string(),
                observation: "1. 能否根据形状联想布局。\n2. 围合技能的运用。\n3. 保持安静专注。".to_string(),
                reflection: "★90%幼儿独立完成拼贴，构思独特。\n▲建构区出现争抢积木。\n◎增加材料规则或引导合作共享。".to_string(),
            },
            collective_activity: CollectiveActivity {
                title: "科学活动《秋叶变变变》".to_string(),
                goals: vec![
                    "1. 观察秋天树叶的颜色变化，了解叶子变黄/红的原因。".to_string(),
                    "2. 能够按颜色、形状对树叶进行分类。".to_string(),
                    "3. 感受秋天大自然的色彩美。".to_string(),
                ],
                prep: "各种颜色的落叶实物、PPT课件、分类筐。".to_string(),
                process: "1. 出示落叶，提问颜色差异。\n2. 观看视频，了解变色秘密。\n3. 游戏：树叶找家分类。\n4. 总结：秋天的多彩变化。".to_string(),
                reflection: "★95%幼儿区分颜色，对原理好奇。\n▲20%幼儿对“叶绿素”词汇理解困难。\n◎语言童趣化，用比喻或实验辅助说明。".to_string(),
            },
            game_activity: TitledSegment {
                title: "角色游戏：美味秋日小铺".to_string(),
                content: "1. 创设柜台，售卖树叶饼干和水果。\n2. 分配店长、收银员等角色。\n3. 鼓励使用礼貌用语。".to_string(),
                observation: "1. 店员服务态度。\n2. 顾客排队支付情况。\n3. 商品装饰创意。".to_string(),
                reflection: "★角色代入感强，能说出秋季水果。\n▲收银换算不熟练。\n◎投放简易价格表降低难度。".to_string(),
            },
            life_activity: ContentSegment {
                content: "1. 午餐活动：介绍南瓜营养，鼓励不挑食。\n2. 如厕/盥洗：排队不推挤，七步洗手法。\n3. 散步活动：寻找不同颜色落叶。\n4. 午睡活动：折叠衣物，安静入睡。".to_string(),
                observation: "1. 尝试秋季蔬菜情况。\n2. 洗手规范度。\n3. 自我服务能力。".to_string(),
                reflection: "★98%幼儿喝光南瓜汤，桌面整洁。\n▲散步过于兴奋跑跳。\n◎明确慢走规则，增加观察任务。".to_string(),
            },
            outdoor_activity: TitledSegment {
                title: "体育游戏：秋风扫落叶".to_string(),
                content: "1. 教师扮风，幼儿扮落叶。\n2. 根据风力变化调整动作。\n3. 增加方向指令难度。".to_string(),
                observation: "1. 反应速度与动作调整。\n2. 躲避障碍物能力。\n3. 静止时的平衡控制。".to_string(),
                reflection: "★100%沉浸情境，反应迅速。\n▲个别奔跑过快易摔倒。\n◎增加肢体动作丰富情节并降低速度。".to_string(),
            },
            dismissal: ContentSegment {
                content: "1. 整理衣物书包。\n2. 一日小结与表扬。\n3. 布置亲子树叶书签任务。".to_string(),
                observation: "1. 整理物品独立性。\n2. 复述任务能力。\n3. 离园秩序。".to_string(),
                reflection: "★大部分幼儿整理有序。\n◎家长群同步通知任务。".to_string(),
            },
        }],
    }
}
